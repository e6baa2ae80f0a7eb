use service_core::observability::init_tracing;
use voice_webhook::{config::VoiceConfig, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = VoiceConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "voice-webhook",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
