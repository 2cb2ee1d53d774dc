use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::admin::extract::{parse_account_id, ActiveCaller, AdminActor};
use crate::errors::AppError;
use crate::governance::error::GovernanceError;
use crate::governance::store::{AccountPage, AccountQuery, SortField, SortOrder, DEFAULT_PAGE_SIZE};
use crate::governance::GovernanceSummary;
use crate::models::account::Role;
use crate::state::AppState;

/// Uniform response body: `{ success, message, data? }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Envelope {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, AppError>;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl From<ListParams> for AccountQuery {
    fn from(p: ListParams) -> Self {
        AccountQuery {
            page: p.page.unwrap_or(1),
            limit: p.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            search: p.search,
            role: p.role,
            active: p.active,
            sort_by: p.sort_by.unwrap_or_default(),
            sort_order: p.sort_order.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub active: bool,
}

/// GET /admin/health
pub async fn handle_admin_health(AdminActor(admin): AdminActor) -> ApiResult<Value> {
    Ok(Envelope::ok(
        "Admin API is healthy",
        json!({
            "timestamp": Utc::now(),
            "admin": {
                "id": admin.id,
                "name": admin.name,
                "email": admin.email,
            }
        }),
    ))
}

/// GET /admin/accounts
pub async fn handle_list_accounts(
    State(state): State<AppState>,
    AdminActor(_): AdminActor,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<AccountPage> {
    let Query(params) =
        params.map_err(|e| AppError::Validation(format!("Invalid query: {}", e.body_text())))?;
    let page = state.governance.list(params.into()).await?;
    Ok(Envelope::ok("Accounts retrieved", page))
}

/// GET /admin/accounts/:id
pub async fn handle_get_account(
    State(state): State<AppState>,
    AdminActor(_): AdminActor,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let account = state.governance.account(parse_account_id(&id)?).await?;
    Ok(Envelope::ok("Account retrieved", json!({ "account": account })))
}

/// GET /admin/governance
pub async fn handle_governance_summary(
    State(state): State<AppState>,
    AdminActor(_): AdminActor,
) -> ApiResult<GovernanceSummary> {
    let summary = state.governance.summary().await?;
    Ok(Envelope::ok("Governance summary", summary))
}

/// PUT /admin/accounts/:id/promote
///
/// Open to any existing, active account: the guard only admits a promotion
/// while no active admin exists, which makes this the bootstrap path.
pub async fn handle_promote(
    State(state): State<AppState>,
    ActiveCaller(caller): ActiveCaller,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let account = state
        .governance
        .promote(parse_account_id(&id)?, caller.id)
        .await?;
    Ok(Envelope::ok(
        "Account promoted to admin successfully",
        json!({ "account": account }),
    ))
}

/// PUT /admin/accounts/:id/demote
pub async fn handle_demote(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let account = state
        .governance
        .demote(parse_account_id(&id)?, admin.id)
        .await?;
    Ok(Envelope::ok(
        "Admin demoted successfully",
        json!({ "account": account }),
    ))
}

/// PUT /admin/accounts/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<Value> {
    let id = parse_account_id(&id)?;
    let Json(StatusUpdate { active }) = body.map_err(|_| {
        AppError::Validation("Validation failed: active must be a boolean".to_string())
    })?;

    // Deactivating the last active admin is reported as a bad request here.
    let account = state
        .governance
        .set_active(id, active, admin.id)
        .await
        .map_err(|e| match e {
            GovernanceError::Conflict(msg) => AppError::Validation(msg),
            other => other.into(),
        })?;

    let message = if active {
        "Account activated successfully"
    } else {
        "Account deactivated successfully"
    };
    Ok(Envelope::ok(message, json!({ "account": account })))
}

/// DELETE /admin/accounts/:id
pub async fn handle_delete_account(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, AppError> {
    state
        .governance
        .delete_account(parse_account_id(&id)?, admin.id)
        .await?;
    Ok(Json(Envelope {
        success: true,
        message: "Account deleted successfully".to_string(),
        data: None,
    }))
}
