pub mod health;

use axum::{
    routing::{get, put},
    Router,
};

use crate::admin::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/admin/health", get(handlers::handle_admin_health))
        .route("/admin/governance", get(handlers::handle_governance_summary))
        .route("/admin/accounts", get(handlers::handle_list_accounts))
        .route(
            "/admin/accounts/:id",
            get(handlers::handle_get_account).delete(handlers::handle_delete_account),
        )
        .route("/admin/accounts/:id/promote", put(handlers::handle_promote))
        .route("/admin/accounts/:id/demote", put(handlers::handle_demote))
        .route(
            "/admin/accounts/:id/status",
            put(handlers::handle_update_status),
        )
        .with_state(state)
}
