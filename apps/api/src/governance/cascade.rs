//! Hand-off to whatever owns per-account resources (job applications,
//! settings) once an account is gone.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::info;
use uuid::Uuid;

use crate::governance::error::GovernanceResult;

#[async_trait]
pub trait CascadeSignal: Send + Sync {
    /// Called for each deleted account until it succeeds once. Receivers
    /// must tolerate the same id arriving more than once.
    async fn account_deleted(&self, id: Uuid) -> GovernanceResult<()>;
}

/// Pushes deleted account ids onto a Redis list for the CRUD workers.
pub struct RedisCascade {
    client: redis::Client,
    queue: String,
}

impl RedisCascade {
    pub fn new(client: redis::Client, queue: impl Into<String>) -> Self {
        Self {
            client,
            queue: queue.into(),
        }
    }
}

#[async_trait]
impl CascadeSignal for RedisCascade {
    async fn account_deleted(&self, id: Uuid) -> GovernanceResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.lpush::<_, _, ()>(&self.queue, id.to_string()).await?;
        info!("Queued cascade deletion for account {id} on '{}'", self.queue);
        Ok(())
    }
}

/// Used when no Redis is configured: logs the deletion and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyCascade;

#[async_trait]
impl CascadeSignal for LogOnlyCascade {
    async fn account_deleted(&self, id: Uuid) -> GovernanceResult<()> {
        info!("Account {id} deleted; no cascade queue configured");
        Ok(())
    }
}

#[cfg(test)]
pub use recording::RecordingCascade;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_only_cascade_accepts_every_deletion() {
        let cascade = LogOnlyCascade;
        for _ in 0..3 {
            assert!(cascade.account_deleted(Uuid::new_v4()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_recording_cascade_keeps_order_and_can_fail() {
        let cascade = RecordingCascade::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        cascade.account_deleted(a).await.unwrap();
        cascade.set_failing(true);
        assert!(cascade.account_deleted(b).await.is_err());
        cascade.set_failing(false);
        cascade.account_deleted(b).await.unwrap();
        assert_eq!(cascade.deleted(), vec![a, b]);
    }
}
