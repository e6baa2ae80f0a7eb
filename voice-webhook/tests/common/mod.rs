#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use service_core::config::Config;
use tower::ServiceExt;
use voice_webhook::config::{SayConfig, TwilioConfig, VoiceConfig};
use voice_webhook::{build_router, AppState, Application};

pub fn test_config() -> VoiceConfig {
    VoiceConfig {
        common: Config {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            ..Config::default()
        },
        say: SayConfig::default(),
        twilio: TwilioConfig::default(),
    }
}

/// In-process router, no socket.
pub fn test_router(config: &VoiceConfig) -> Router {
    build_router(AppState::new(config))
}

pub async fn send(router: &Router, request: Request<Body>) -> (Response<Body>, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes().to_vec();
    (Response::from_parts(parts, Body::empty()), bytes)
}

pub fn content_type(response: &Response<Body>) -> String {
    response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: VoiceConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }
}

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Parse a `/voice` body, failing on anything that is not well-formed XML.
pub fn parse_twiml(body: &str) -> roxmltree::Document<'_> {
    assert!(
        body.starts_with(XML_DECLARATION),
        "missing XML declaration: {:?}",
        body
    );
    roxmltree::Document::parse(body).expect("voice document is not well-formed XML")
}

/// The single `<Say>` under `<Response>`.
pub fn only_say<'a, 'input>(
    document: &'a roxmltree::Document<'input>,
) -> roxmltree::Node<'a, 'input> {
    let root = document.root_element();
    assert_eq!(root.tag_name().name(), "Response");

    let children: Vec<_> = root.children().filter(|n| n.is_element()).collect();
    assert_eq!(children.len(), 1, "Response must have exactly one child");

    let say = children[0];
    assert_eq!(say.tag_name().name(), "Say");
    say
}
