use crate::twiml::is_xml_char;
use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::middleware::signature::WebhookSignatureConfig;
use std::env;

pub const DEFAULT_SAY_TEXT: &str = "¡Gracias por ver el video!";
pub const DEFAULT_SAY_LANGUAGE: &str = "es-ES";
pub const DEFAULT_SAY_VOICE: &str = "Polly.Conchita";

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub common: core_config::Config,
    pub say: SayConfig,
    pub twilio: TwilioConfig,
}

/// What the `/voice` document speaks, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SayConfig {
    pub text: String,
    pub language: String,
    pub voice: String,
}

impl Default for SayConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_SAY_TEXT.to_string(),
            language: DEFAULT_SAY_LANGUAGE.to_string(),
            voice: DEFAULT_SAY_VOICE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Off unless explicitly enabled; inbound calls are then accepted unsigned.
    pub validate_signature: bool,
    pub auth_token: Secret<String>,
    pub public_base_url: Option<String>,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            validate_signature: false,
            auth_token: Secret::new(String::new()),
            public_base_url: None,
        }
    }
}

impl TwilioConfig {
    pub fn signature_config(&self) -> WebhookSignatureConfig {
        WebhookSignatureConfig {
            require_signatures: self.validate_signature,
            auth_token: self.auth_token.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }
}

impl VoiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Assemble the service settings from `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let validate_signature = match lookup("TWILIO_VALIDATE_SIGNATURE") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                AppError::ConfigError(anyhow::anyhow!(
                    "TWILIO_VALIDATE_SIGNATURE must be true or false, got '{}'",
                    raw
                ))
            })?,
            None => false,
        };

        let config = VoiceConfig {
            common,
            say: SayConfig {
                text: get("VOICE_SAY_TEXT", DEFAULT_SAY_TEXT),
                language: get("VOICE_SAY_LANGUAGE", DEFAULT_SAY_LANGUAGE),
                voice: get("VOICE_SAY_VOICE", DEFAULT_SAY_VOICE),
            },
            twilio: TwilioConfig {
                validate_signature,
                auth_token: Secret::new(lookup("TWILIO_AUTH_TOKEN").unwrap_or_default()),
                public_base_url: lookup("PUBLIC_BASE_URL").filter(|v| !v.trim().is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        for (key, value) in [
            ("VOICE_SAY_TEXT", &self.say.text),
            ("VOICE_SAY_LANGUAGE", &self.say.language),
            ("VOICE_SAY_VOICE", &self.say.voice),
        ] {
            if let Some(c) = value.chars().find(|c| !is_xml_char(*c)) {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} contains a character not allowed in XML: {:?}",
                    key,
                    c
                )));
            }
        }

        if self.twilio.validate_signature && self.twilio.auth_token.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TWILIO_AUTH_TOKEN is required when TWILIO_VALIDATE_SIGNATURE is enabled"
            )));
        }
        Ok(())
    }
}
