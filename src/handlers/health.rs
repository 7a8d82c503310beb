use axum::response::{IntoResponse, Json};
use serde_json::json;

/// Liveness probe; the bridge holds no connections worth checking
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
