use thiserror::Error;
use uuid::Uuid;

/// Outcome of a rejected governance operation.
///
/// Every variant is terminal for the call that produced it; nothing is retried
/// and nothing was written.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("Account {0} not found")]
    NotFound(Uuid),

    /// The mutation would break the single-active-admin rule.
    #[error("{0}")]
    Conflict(String),

    /// The operation does not apply to the account's current state.
    #[error("{0}")]
    Precondition(String),

    #[error("Account store unavailable: {0}")]
    StoreUnavailable(String),
}

impl GovernanceError {
    pub fn conflict(message: impl Into<String>) -> Self {
        GovernanceError::Conflict(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        GovernanceError::Precondition(message.into())
    }
}

impl From<sqlx::Error> for GovernanceError {
    fn from(e: sqlx::Error) -> Self {
        GovernanceError::StoreUnavailable(e.to_string())
    }
}

impl From<redis::RedisError> for GovernanceError {
    fn from(e: redis::RedisError) -> Self {
        GovernanceError::StoreUnavailable(e.to_string())
    }
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;
