//! Guard predicates for the single-active-admin rule.
//!
//! Stores call [`evaluate`] inside their own critical section, with the target
//! and the admin counts read in that same section, so check and write cannot
//! be separated by a concurrent mutation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::governance::error::{GovernanceError, GovernanceResult};
use crate::models::account::Account;

pub const MSG_ADMIN_EXISTS: &str = "Only one admin is allowed. An admin already exists.";
pub const MSG_ALREADY_ADMIN: &str = "Account is already an admin";
pub const MSG_PROMOTE_INACTIVE: &str = "Cannot promote an inactive account";
pub const MSG_REACTIVATE_ADMIN: &str = "Cannot reactivate an admin while another admin is active";
pub const MSG_NOT_ADMIN: &str = "Account is not an admin";
pub const MSG_LAST_ADMIN_DEMOTE: &str = "Cannot demote the last admin";
pub const MSG_LAST_ADMIN_DEACTIVATE: &str = "Cannot deactivate the last active admin";
pub const MSG_LAST_ADMIN_DELETE: &str = "Cannot delete the last admin";

/// Admin population as of one logical instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdminCounts {
    /// role = admin and active = true
    pub active: u64,
    /// role = admin regardless of the active flag
    pub total: u64,
}

impl AdminCounts {
    #[cfg(test)]
    pub fn tally<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        accounts
            .into_iter()
            .filter(|a| a.is_admin())
            .fold(AdminCounts::default(), |mut counts, a| {
                counts.total += 1;
                if a.active {
                    counts.active += 1;
                }
                counts
            })
    }
}

/// A governed state transition on one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Promote { actor: Uuid, at: DateTime<Utc> },
    Demote,
    SetActive(bool),
    Delete,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Promote { .. } => "promote",
            Mutation::Demote => "demote",
            Mutation::SetActive(_) => "set_active",
            Mutation::Delete => "delete",
        }
    }
}

/// Decides whether `mutation` may be applied to `target` given `counts`.
pub fn evaluate(
    id: Uuid,
    target: Option<&Account>,
    counts: AdminCounts,
    mutation: &Mutation,
) -> GovernanceResult<()> {
    match mutation {
        Mutation::Promote { .. } => {
            // Promotion is closed as soon as any active admin exists,
            // whether or not the target is present.
            if counts.active > 0 {
                return Err(GovernanceError::conflict(MSG_ADMIN_EXISTS));
            }
            let target = target.ok_or(GovernanceError::NotFound(id))?;
            if target.is_admin() {
                return Err(GovernanceError::precondition(MSG_ALREADY_ADMIN));
            }
            // An inactive admin would leave the active count at zero and
            // the promotion window open for a second account.
            if !target.active {
                return Err(GovernanceError::precondition(MSG_PROMOTE_INACTIVE));
            }
            Ok(())
        }
        Mutation::Demote => {
            let target = target.ok_or(GovernanceError::NotFound(id))?;
            if !target.is_admin() {
                return Err(GovernanceError::precondition(MSG_NOT_ADMIN));
            }
            if counts.active <= 1 {
                return Err(GovernanceError::conflict(MSG_LAST_ADMIN_DEMOTE));
            }
            Ok(())
        }
        Mutation::SetActive(active) => {
            let target = target.ok_or(GovernanceError::NotFound(id))?;
            if !active && target.is_active_admin() && counts.active <= 1 {
                return Err(GovernanceError::conflict(MSG_LAST_ADMIN_DEACTIVATE));
            }
            if *active && target.is_admin() && !target.active && counts.active >= 1 {
                return Err(GovernanceError::conflict(MSG_REACTIVATE_ADMIN));
            }
            Ok(())
        }
        Mutation::Delete => {
            let target = target.ok_or(GovernanceError::NotFound(id))?;
            let last_admin = target.is_admin() && counts.total <= 1;
            let last_active_admin = target.is_active_admin() && counts.active <= 1;
            if last_admin || last_active_admin {
                return Err(GovernanceError::conflict(MSG_LAST_ADMIN_DELETE));
            }
            Ok(())
        }
    }
}
