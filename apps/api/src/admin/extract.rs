//! Caller identity for the admin API.
//!
//! Authentication happens upstream; the auth middleware forwards the
//! authenticated account id in `X-Account-Id`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::governance::error::GovernanceError;
use crate::models::account::Account;
use crate::state::AppState;

pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Any authenticated account.
pub struct Caller(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACCOUNT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Caller)
            .ok_or(AppError::Unauthorized)
    }
}

/// An authenticated caller that names an existing, active account.
pub struct ActiveCaller(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for ActiveCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = resolve_caller(parts, state).await?;
        if !account.active {
            return Err(AppError::Forbidden("Account is inactive".to_string()));
        }
        Ok(ActiveCaller(account))
    }
}

/// An authenticated caller that is currently an active admin.
pub struct AdminActor(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for AdminActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = resolve_caller(parts, state).await?;
        if !account.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        if !account.active {
            return Err(AppError::Forbidden("Admin account is inactive".to_string()));
        }
        Ok(AdminActor(account))
    }
}

/// Looks up the account behind `X-Account-Id`. An id naming no account is
/// treated as unauthenticated.
async fn resolve_caller(parts: &mut Parts, state: &AppState) -> Result<Account, AppError> {
    let Caller(id) = Caller::from_request_parts(parts, state).await?;
    match state.governance.account(id).await {
        Ok(account) => Ok(account),
        Err(GovernanceError::NotFound(_)) => Err(AppError::Unauthorized),
        Err(e) => Err(e.into()),
    }
}

/// Parses an account id path segment.
pub fn parse_account_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid account id '{raw}'")))
}
