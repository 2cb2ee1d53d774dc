use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::governance::error::GovernanceResult;
use crate::governance::rules::{AdminCounts, Mutation};
use crate::models::account::{Account, Role};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// The account collection the enforcer governs.
///
/// `apply` is the only write path. Implementations must read the target and
/// the admin counts, run [`crate::governance::rules::evaluate`] and write the
/// result as one indivisible step: no other `apply` may interleave. A
/// successful `Delete` also records the id in the cascade outbox within that
/// step, so a committed deletion is never without a pending cascade entry.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find(&self, id: Uuid) -> GovernanceResult<Option<Account>>;

    async fn admin_counts(&self) -> GovernanceResult<AdminCounts>;

    async fn list(&self, query: &AccountQuery) -> GovernanceResult<AccountPage>;

    /// Applies `mutation` to account `id` if the guard holds. Returns the
    /// account as written, or as it was just before removal for `Delete`.
    async fn apply(&self, id: Uuid, mutation: Mutation) -> GovernanceResult<Account>;

    /// Deleted account ids whose cascade signal is not yet delivered, oldest first.
    async fn pending_cascades(&self, limit: u32) -> GovernanceResult<Vec<Uuid>>;

    /// Drops `id` from the cascade outbox. Unknown ids are ignored.
    async fn cascade_delivered(&self, id: Uuid) -> GovernanceResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Name,
    Email,
    LastLogin,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Name => "name",
            SortField::Email => "email",
            SortField::LastLogin => "last_login",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters and paging for the admin account listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQuery {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for AccountQuery {
    fn default() -> Self {
        AccountQuery {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
            role: None,
            active: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl AccountQuery {
    /// Clamps page and limit into their valid ranges and drops a blank search.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_accounts: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(limit.max(1)));
        Pagination {
            current_page: page,
            total_pages,
            total_accounts: total,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}
