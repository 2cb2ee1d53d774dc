//! Admin governance: keeps the system at exactly one active admin once one
//! exists, across promote, demote, deactivate and delete.
//!
//! No admin state is cached here. Every guard runs inside the store's
//! atomic `apply`, against counts read in that same step.

pub mod cascade;
pub mod error;
#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod rules;
pub mod store;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::governance::cascade::CascadeSignal;
use crate::governance::error::{GovernanceError, GovernanceResult};
use crate::governance::rules::Mutation;
use crate::governance::store::{AccountPage, AccountQuery, AccountStore};
use crate::models::account::Account;

/// Pending cascade entries read per [`Governance::flush_cascades`] call.
const CASCADE_BATCH: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GovernanceSummary {
    pub active_admins: u64,
    pub total_admins: u64,
    pub can_promote: bool,
}

#[derive(Clone)]
pub struct Governance {
    store: Arc<dyn AccountStore>,
    cascade: Arc<dyn CascadeSignal>,
}

impl Governance {
    pub fn new(store: Arc<dyn AccountStore>, cascade: Arc<dyn CascadeSignal>) -> Self {
        Self { store, cascade }
    }

    /// True only while there is no active admin.
    pub async fn can_promote(&self) -> GovernanceResult<bool> {
        Ok(self.store.admin_counts().await?.active == 0)
    }

    /// Makes `id` the admin, recording `actor` as the promoter.
    pub async fn promote(&self, id: Uuid, actor: Uuid) -> GovernanceResult<Account> {
        let mutation = Mutation::Promote {
            actor,
            at: Utc::now(),
        };
        let account = self.apply(id, mutation, actor).await?;
        info!("Account {id} promoted to admin by {actor}");
        Ok(account)
    }

    pub async fn demote(&self, id: Uuid, actor: Uuid) -> GovernanceResult<Account> {
        let account = self.apply(id, Mutation::Demote, actor).await?;
        info!("Admin {id} demoted by {actor}");
        Ok(account)
    }

    /// Idempotent for accounts already in the requested state. Deactivating
    /// the last active admin, or reactivating an admin while another admin is
    /// active, is a conflict.
    pub async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        actor: Uuid,
    ) -> GovernanceResult<Account> {
        let account = self.apply(id, Mutation::SetActive(active), actor).await?;
        info!(
            "Account {id} {} by {actor}",
            if active { "activated" } else { "deactivated" }
        );
        Ok(account)
    }

    /// Removes the account, then tells the cascade collaborator. The store
    /// queues the id in its outbox as part of the deletion, so a failed signal
    /// leaves it pending for [`Governance::flush_cascades`] and the deletion
    /// still succeeds.
    pub async fn delete_account(&self, id: Uuid, actor: Uuid) -> GovernanceResult<Account> {
        let account = self.apply(id, Mutation::Delete, actor).await?;
        info!("Account {id} deleted by {actor}");

        match self.cascade.account_deleted(id).await {
            Ok(()) => {
                if let Err(e) = self.store.cascade_delivered(id).await {
                    warn!("Cascade for account {id} sent but still marked pending: {e}");
                }
            }
            Err(e) => warn!("Cascade signal for account {id} failed, will retry: {e}"),
        }
        Ok(account)
    }

    /// Re-sends pending cascade signals, oldest first. Stops at the first
    /// signal failure and returns how many were delivered.
    pub async fn flush_cascades(&self) -> GovernanceResult<usize> {
        let pending = self.store.pending_cascades(CASCADE_BATCH).await?;
        let mut delivered = 0;
        for id in pending {
            if let Err(e) = self.cascade.account_deleted(id).await {
                warn!("Cascade retry for account {id} failed: {e}");
                break;
            }
            self.store.cascade_delivered(id).await?;
            delivered += 1;
        }
        if delivered > 0 {
            info!("Delivered {delivered} pending cascade signal(s)");
        }
        Ok(delivered)
    }

    pub async fn account(&self, id: Uuid) -> GovernanceResult<Account> {
        self.store
            .find(id)
            .await?
            .ok_or(GovernanceError::NotFound(id))
    }

    pub async fn list(&self, query: AccountQuery) -> GovernanceResult<AccountPage> {
        self.store.list(&query.normalized()).await
    }

    pub async fn summary(&self) -> GovernanceResult<GovernanceSummary> {
        let counts = self.store.admin_counts().await?;
        Ok(GovernanceSummary {
            active_admins: counts.active,
            total_admins: counts.total,
            can_promote: counts.active == 0,
        })
    }

    async fn apply(&self, id: Uuid, mutation: Mutation, actor: Uuid) -> GovernanceResult<Account> {
        match self.store.apply(id, mutation).await {
            Ok(account) => Ok(account),
            Err(e @ GovernanceError::StoreUnavailable(_)) => {
                error!("{} on account {id} failed: {e}", mutation.name());
                Err(e)
            }
            Err(e) => {
                warn!("{} on account {id} by {actor} rejected: {e}", mutation.name());
                Err(e)
            }
        }
    }
}
