use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::governance::error::{GovernanceError, GovernanceResult};
use crate::governance::rules::{self, AdminCounts, Mutation};
use crate::governance::store::{AccountPage, AccountQuery, AccountStore, Pagination, SortOrder};
use crate::models::account::{Account, AccountRow, Role};

/// Advisory lock key held for the duration of every governance transaction.
/// Serialises guard-and-write across all server instances sharing the database.
const GOVERNANCE_LOCK_KEY: i64 = 0x6164_6d69_6e5f_6776; // "admin_gv"

const ACCOUNT_COLUMNS: &str =
    "id, name, email, role, active, promoted_by, promoted_at, created_at, last_login";

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find(&self, id: Uuid) -> GovernanceResult<Option<Account>> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(into_account).transpose()
    }

    async fn admin_counts(&self) -> GovernanceResult<AdminCounts> {
        let (active, total): (i64, i64) = sqlx::query_as(COUNT_ADMINS_SQL)
            .fetch_one(&self.pool)
            .await?;
        Ok(to_counts(active, total))
    }

    async fn list(&self, query: &AccountQuery) -> GovernanceResult<AccountPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {ACCOUNT_COLUMNS} FROM accounts"));
        push_filters(&mut select, query);
        select.push(order_clause(query));
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows: Vec<AccountRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let accounts = rows
            .into_iter()
            .map(into_account)
            .collect::<GovernanceResult<Vec<_>>>()?;

        Ok(AccountPage {
            accounts,
            pagination: Pagination::new(query.page, query.limit, total.max(0) as u64),
        })
    }

    async fn apply(&self, id: Uuid, mutation: Mutation) -> GovernanceResult<Account> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(GOVERNANCE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let target = lock_target(&mut tx, id).await?;
        let (active, total): (i64, i64) = sqlx::query_as(COUNT_ADMINS_SQL)
            .fetch_one(&mut *tx)
            .await?;
        let counts = to_counts(active, total);

        debug!(%id, op = mutation.name(), ?counts, "Evaluating governance guard");
        // An early return here drops `tx`, which rolls it back.
        rules::evaluate(id, target.as_ref(), counts, &mutation)?;

        let row: AccountRow = match mutation {
            Mutation::Promote { actor, at } => {
                sqlx::query_as(&format!(
                    "UPDATE accounts SET role = $2, promoted_by = $3, promoted_at = $4 \
                     WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
                ))
                .bind(id)
                .bind(Role::Admin.as_str())
                .bind(actor)
                .bind(at)
                .fetch_one(&mut *tx)
                .await?
            }
            Mutation::Demote => {
                sqlx::query_as(&format!(
                    "UPDATE accounts SET role = $2, promoted_by = NULL, promoted_at = NULL \
                     WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
                ))
                .bind(id)
                .bind(Role::Standard.as_str())
                .fetch_one(&mut *tx)
                .await?
            }
            Mutation::SetActive(active) => {
                sqlx::query_as(&format!(
                    "UPDATE accounts SET active = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
                ))
                .bind(id)
                .bind(active)
                .fetch_one(&mut *tx)
                .await?
            }
            Mutation::Delete => {
                let row = sqlx::query_as(&format!(
                    "DELETE FROM accounts WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
                ))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO cascade_outbox (account_id) VALUES ($1) \
                     ON CONFLICT (account_id) DO NOTHING",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
                row
            }
        };

        tx.commit().await?;
        into_account(row)
    }

    async fn pending_cascades(&self, limit: u32) -> GovernanceResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar(
            "SELECT account_id FROM cascade_outbox ORDER BY deleted_at, account_id LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn cascade_delivered(&self, id: Uuid) -> GovernanceResult<()> {
        sqlx::query("DELETE FROM cascade_outbox WHERE account_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

const COUNT_ADMINS_SQL: &str = "SELECT COUNT(*) FILTER (WHERE active), COUNT(*) \
                                FROM accounts WHERE role = 'admin'";

async fn lock_target(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> GovernanceResult<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    row.map(into_account).transpose()
}

fn into_account(row: AccountRow) -> GovernanceResult<Account> {
    let id = row.id;
    Account::try_from(row)
        .map_err(|e| GovernanceError::StoreUnavailable(format!("corrupt account {id}: {e}")))
}

fn to_counts(active: i64, total: i64) -> AdminCounts {
    AdminCounts {
        active: active.max(0) as u64,
        total: total.max(0) as u64,
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AccountQuery) {
    let mut sep = " WHERE ";
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder
            .push(sep)
            .push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
        sep = " AND ";
    }
    if let Some(role) = query.role {
        builder.push(sep).push("role = ").push_bind(role.as_str());
        sep = " AND ";
    }
    if let Some(active) = query.active {
        builder.push(sep).push("active = ").push_bind(active);
    }
}

/// `%term%` with LIKE metacharacters in `term` escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn order_clause(query: &AccountQuery) -> String {
    let direction = match query.sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!(" ORDER BY {} {direction}, id {direction}", query.sort_by.column())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::store::SortField;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_order_clause_uses_whitelisted_column() {
        let q = AccountQuery {
            sort_by: SortField::LastLogin,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        assert_eq!(order_clause(&q), " ORDER BY last_login ASC, id ASC");
        assert_eq!(
            order_clause(&AccountQuery::default()),
            " ORDER BY created_at DESC, id DESC"
        );
    }

    #[test]
    fn test_push_filters_binds_every_condition() {
        let q = AccountQuery {
            search: Some("ada".into()),
            role: Some(Role::Admin),
            active: Some(true),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts");
        push_filters(&mut builder, &q);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM accounts WHERE (name ILIKE $1 OR email ILIKE $2) \
             AND role = $3 AND active = $4"
        );
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        assert_eq!(to_counts(-1, 3), AdminCounts { active: 0, total: 3 });
    }
}
