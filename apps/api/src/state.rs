use crate::governance::Governance;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Enforcer for every admin role, activity and deletion change.
    /// Backed by `PgAccountStore` in production, `MemoryAccountStore` in tests.
    pub governance: Governance,
}
