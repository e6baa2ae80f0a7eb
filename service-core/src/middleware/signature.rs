use crate::error::AppError;
use crate::utils::signature::{verify_body_hash, verify_signature};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use secrecy::{ExposeSecret, Secret};

pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Largest body buffered for signature checks. Provider call webhooks are a
/// few kilobytes of form fields.
pub const MAX_SIGNED_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct WebhookSignatureConfig {
    pub require_signatures: bool,
    pub auth_token: Secret<String>,
    /// Externally visible origin, e.g. `https://voice.example.com`. When unset
    /// the URL is rebuilt from `x-forwarded-proto` and `Host`.
    pub public_base_url: Option<String>,
}

impl Default for WebhookSignatureConfig {
    fn default() -> Self {
        Self {
            require_signatures: false,
            auth_token: Secret::new(String::new()),
            public_base_url: None,
        }
    }
}

/// Reject webhook calls whose `X-Twilio-Signature` does not match the request.
///
/// Meant to be installed with `route_layer` so unmatched paths keep their
/// default 404. The buffered body is handed on unchanged.
pub async fn webhook_signature_middleware<S>(
    State(state): State<S>,
    req: Request,
    next: Next,
) -> Result<Response, AppError>
where
    S: AsRef<WebhookSignatureConfig> + Clone + Send + Sync + 'static,
{
    let config = state.as_ref();

    if !config.require_signatures {
        return Ok(next.run(req).await);
    }

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("Missing signature header")))?
        .to_str()
        .map_err(|_| AppError::Forbidden(anyhow::anyhow!("Invalid signature header")))?
        .to_string();

    let (parts, body) = req.into_parts();
    if declared_length(&parts).is_some_and(|len| len > MAX_SIGNED_BODY_BYTES as u64) {
        return Err(body_too_large());
    }

    let bytes = Limited::new(body, MAX_SIGNED_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                body_too_large()
            } else {
                AppError::InternalError(anyhow::anyhow!("Failed to read body: {}", e))
            }
        })?
        .to_bytes();

    let url = signed_url(&parts, config.public_base_url.as_deref());
    let params = if is_form_encoded(&parts) {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Malformed form body: {}", e)))?
    } else {
        Vec::new()
    };

    let is_valid = verify_signature(config.auth_token.expose_secret(), &url, &params, &signature)
        .map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Signature verification error: {}", e))
        })?;

    if !is_valid {
        tracing::warn!(url = %url, "Webhook signature mismatch");
        return Err(AppError::Forbidden(anyhow::anyhow!("Invalid signature")));
    }

    if !verify_body_hash(parts.uri.query(), &bytes) {
        tracing::warn!(url = %url, "Webhook body hash mismatch");
        return Err(AppError::Forbidden(anyhow::anyhow!("Body hash mismatch")));
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

fn declared_length(parts: &Parts) -> Option<u64> {
    parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn body_too_large() -> AppError {
    AppError::PayloadTooLarge(anyhow::anyhow!(
        "Request body exceeds {} bytes",
        MAX_SIGNED_BODY_BYTES
    ))
}

fn is_form_encoded(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Rebuild the URL the provider called, which is what it signed.
fn signed_url(parts: &Parts, public_base_url: Option<&str>) -> String {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());

    if let Some(base) = public_base_url {
        return format!("{}{}", base.trim_end_matches('/'), path_and_query);
    }

    let scheme = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .unwrap_or("https");

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}{}", scheme, host, path_and_query)
}
