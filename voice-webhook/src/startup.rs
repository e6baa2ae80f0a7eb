//! Application startup and lifecycle management.

use crate::config::VoiceConfig;
use crate::handlers;
use crate::services::init_metrics;
use crate::twiml::voice_document;
use axum::{
    body::Body,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    signature::{webhook_signature_middleware, WebhookSignatureConfig},
    tracing::{make_request_span, request_id_middleware},
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Rendered `/voice` document.
    pub twiml: Bytes,
    pub signature_config: WebhookSignatureConfig,
}

impl AppState {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            twiml: voice_document(&config.say),
            signature_config: config.twilio.signature_config(),
        }
    }
}

impl AsRef<WebhookSignatureConfig> for AppState {
    fn as_ref(&self) -> &WebhookSignatureConfig {
        &self.signature_config
    }
}

pub fn build_router(state: AppState) -> Router {
    // Signature checks only run once `/voice` has matched, so other paths
    // keep the default 404/405 handling.
    let webhook = Router::new()
        .route("/voice", post(handlers::voice::voice_webhook))
        .route_layer(from_fn_with_state(
            state.clone(),
            webhook_signature_middleware::<AppState>,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(webhook)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Bind the listener and assemble the router.
    ///
    /// Fails when the address cannot be bound; there is no retry.
    pub async fn build(config: VoiceConfig) -> Result<Self, AppError> {
        init_metrics();

        let state = AppState::new(&config);
        if state.signature_config.require_signatures {
            tracing::info!("Webhook signature validation enabled");
        } else {
            tracing::warn!("Webhook signature validation disabled - /voice accepts any caller");
        }

        let address = config.common.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("voice-webhook listening on {}:{}", config.common.host, port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Port actually bound (differs from the configured one when that was 0).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl-C or SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
