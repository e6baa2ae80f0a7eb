use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub const ROOT_MESSAGE: &str = "✅ Backend de voz activo. Endpoint: POST /voice";

pub async fn index() -> &'static str {
    ROOT_MESSAGE
}

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "voice-webhook",
            "version": env!("CARGO_PKG_VERSION"),
            "ts": chrono::Utc::now().timestamp()
        })),
    )
}

pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}
