//! In-process account store. Every `apply` runs guard and write under one
//! mutex acquisition, which is the atomic conditional update the enforcer
//! relies on. A delete queues its cascade entry under that same acquisition.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::governance::error::{GovernanceError, GovernanceResult};
use crate::governance::rules::{self, AdminCounts, Mutation};
use crate::governance::store::{
    AccountPage, AccountQuery, AccountStore, Pagination, SortField, SortOrder,
};
use crate::models::account::Account;

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    outbox: Vec<Uuid>,
}

#[derive(Default)]
pub struct MemoryAccountStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account as-is, bypassing the guards.
    pub fn insert(&self, account: Account) -> GovernanceResult<()> {
        self.lock()?.accounts.insert(account.id, account);
        Ok(())
    }

    /// Makes every subsequent call fail with `StoreUnavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn lock(&self) -> GovernanceResult<MutexGuard<'_, MemoryState>> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(GovernanceError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| GovernanceError::StoreUnavailable("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find(&self, id: Uuid) -> GovernanceResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn admin_counts(&self) -> GovernanceResult<AdminCounts> {
        Ok(AdminCounts::tally(self.lock()?.accounts.values()))
    }

    async fn list(&self, query: &AccountQuery) -> GovernanceResult<AccountPage> {
        let state = self.lock()?;
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut matched: Vec<&Account> = state
            .accounts
            .values()
            .filter(|a| query.role.map_or(true, |r| a.role == r))
            .filter(|a| query.active.map_or(true, |active| a.active == active))
            .filter(|a| {
                needle.as_deref().map_or(true, |n| {
                    a.name.to_lowercase().contains(n) || a.email.to_lowercase().contains(n)
                })
            })
            .collect();

        matched.sort_by(|a, b| {
            let ord = compare(a, b, query.sort_by).then_with(|| a.id.cmp(&b.id));
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page = matched
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(AccountPage {
            accounts: page,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    async fn apply(&self, id: Uuid, mutation: Mutation) -> GovernanceResult<Account> {
        let mut state = self.lock()?;
        let counts = AdminCounts::tally(state.accounts.values());
        rules::evaluate(id, state.accounts.get(&id), counts, &mutation)?;

        if mutation == Mutation::Delete {
            let removed = state
                .accounts
                .remove(&id)
                .ok_or(GovernanceError::NotFound(id))?;
            state.outbox.push(id);
            return Ok(removed);
        }

        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(GovernanceError::NotFound(id))?;
        match mutation {
            Mutation::Promote { actor, at } => account.apply_promotion(Some(actor), at),
            Mutation::Demote => account.apply_demotion(),
            Mutation::SetActive(active) => account.active = active,
            Mutation::Delete => {}
        }
        Ok(account.clone())
    }

    async fn pending_cascades(&self, limit: u32) -> GovernanceResult<Vec<Uuid>> {
        Ok(self
            .lock()?
            .outbox
            .iter()
            .take(limit as usize)
            .copied()
            .collect())
    }

    async fn cascade_delivered(&self, id: Uuid) -> GovernanceResult<()> {
        self.lock()?.outbox.retain(|pending| *pending != id);
        Ok(())
    }
}

fn compare(a: &Account, b: &Account, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Email => a.email.cmp(&b.email),
        SortField::LastLogin => a.last_login.cmp(&b.last_login),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Role;
    use chrono::{Duration, Utc};

    fn seeded() -> (MemoryAccountStore, Vec<Uuid>) {
        let store = MemoryAccountStore::new();
        let now = Utc::now();
        let mut ids = Vec::new();
        for (i, (name, role, active)) in [
            ("Alice", Role::Admin, true),
            ("Bob", Role::Standard, true),
            ("Carol", Role::Standard, false),
            ("alan", Role::Standard, true),
        ]
        .into_iter()
        .enumerate()
        {
            let mut a = Account::new(name, format!("{}@example.com", name.to_lowercase()));
            a.role = role;
            a.active = active;
            a.created_at = now - Duration::minutes(i as i64);
            ids.push(a.id);
            store.insert(a).unwrap();
        }
        (store, ids)
    }

    #[tokio::test]
    async fn test_list_filters_by_search_role_and_active() {
        let (store, _) = seeded();

        let q = AccountQuery {
            search: Some("AL".into()),
            ..Default::default()
        };
        let page = store.list(&q).await.unwrap();
        let names: Vec<_> = page.accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "alan"]);

        let q = AccountQuery {
            role: Some(Role::Standard),
            active: Some(true),
            ..Default::default()
        };
        let page = store.list(&q).await.unwrap();
        assert_eq!(page.pagination.total_accounts, 2);
        assert!(page.accounts.iter().all(|a| a.role == Role::Standard && a.active));
    }

    #[tokio::test]
    async fn test_list_sorts_and_pages() {
        let (store, _) = seeded();
        let q = AccountQuery {
            page: 2,
            limit: 3,
            sort_by: SortField::Name,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let page = store.list(&q).await.unwrap();
        // Byte order puts lowercase "alan" last.
        assert_eq!(page.accounts.len(), 1);
        assert_eq!(page.accounts[0].name, "alan");
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.pagination.has_prev);
        assert!(!page.pagination.has_next);
    }

    #[tokio::test]
    async fn test_list_defaults_to_newest_first() {
        let (store, ids) = seeded();
        let page = store.list(&AccountQuery::default()).await.unwrap();
        assert_eq!(page.accounts[0].id, ids[0]);
        assert_eq!(page.accounts[3].id, ids[3]);
    }

    #[tokio::test]
    async fn test_apply_delete_removes_account_and_queues_cascade() {
        let (store, ids) = seeded();
        let removed = store.apply(ids[1], Mutation::Delete).await.unwrap();
        assert_eq!(removed.name, "Bob");
        assert!(store.find(ids[1]).await.unwrap().is_none());
        assert_eq!(store.pending_cascades(10).await.unwrap(), vec![ids[1]]);

        store.cascade_delivered(ids[1]).await.unwrap();
        assert!(store.pending_cascades(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_delete_queues_nothing() {
        let (store, ids) = seeded();
        assert!(store.apply(ids[0], Mutation::Delete).await.is_err());
        assert!(store.pending_cascades(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_apply_leaves_state_untouched() {
        let (store, ids) = seeded();
        let before = store.find(ids[0]).await.unwrap();
        assert!(store.apply(ids[0], Mutation::Demote).await.is_err());
        assert_eq!(store.find(ids[0]).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_unavailable_store_reports_error() {
        let (store, ids) = seeded();
        store.set_unavailable(true);
        assert!(matches!(
            store.find(ids[0]).await,
            Err(GovernanceError::StoreUnavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.find(ids[0]).await.unwrap().is_some());
    }
}
