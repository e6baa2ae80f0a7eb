use axum::{extract::State, http::header, response::IntoResponse};

use crate::services::metrics::record_voice_response;
use crate::twiml::TWIML_CONTENT_TYPE;
use crate::AppState;

/// Inbound call webhook.
///
/// The request body is never read: every call gets the document rendered at
/// startup, whatever the caller sent.
pub async fn voice_webhook(State(state): State<AppState>) -> impl IntoResponse {
    record_voice_response();
    tracing::debug!("Serving voice document");

    ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], state.twiml.clone())
}
