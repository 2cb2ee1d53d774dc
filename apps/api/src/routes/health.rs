use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Returns the service name and version in the standard envelope.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "ok",
        "data": {
            "version": env!("CARGO_PKG_VERSION"),
            "service": env!("CARGO_PKG_NAME")
        }
    }))
}
