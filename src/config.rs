//! Process configuration
//!
//! Read once at startup and shared read-only with every request.

use thiserror::Error;

const DEFAULT_API_VERSION: &str = "2024-05-01-preview";
const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_PORT: u16 = 7071;

/// Errors raised while building the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Credentials and routing for the assistant provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    /// Model deployment used when the assistant has to be created
    pub deployment: String,
    /// Fixed assistant; `None` means create one from the static definition
    pub assistant_id: Option<String>,
}

/// Settings for the `sendEmail` tool
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    pub receiver: Option<String>,
    pub sender_url: Option<String>,
    pub dry_run: bool,
}

/// Immutable service configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub provider: ProviderConfig,
    pub email: EmailConfig,
    pub port: u16,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let provider = ProviderConfig {
            api_key: require("AZURE_OPENAI_API_KEY")?,
            endpoint: require("AZURE_OPENAI_ENDPOINT")?,
            api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            deployment: get("AZURE_DEPLOYMENT_NAME")
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            assistant_id: get("AZURE_ASSISTANT_ID"),
        };

        let dry_run = match get("EMAIL_DRY_RUN") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                var: "EMAIL_DRY_RUN",
                value,
            })?,
            None => false,
        };

        let email = EmailConfig {
            receiver: get("EMAIL_RECEIVER"),
            sender_url: get("EMAIL_SENDER_URL"),
            dry_run,
        };

        let port = match get("RELAY_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "RELAY_PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            provider,
            email,
            port,
        })
    }

    /// Log the effective configuration without secrets
    pub fn log_summary(&self) {
        tracing::info!(
            endpoint = %self.provider.endpoint,
            api_version = %self.provider.api_version,
            deployment = %self.provider.deployment,
            assistant_id = ?self.provider.assistant_id,
            api_key_set = !self.provider.api_key.is_empty(),
            email_receiver = ?self.email.receiver,
            email_relay_set = self.email.sender_url.is_some(),
            email_dry_run = self.email.dry_run,
            port = self.port,
            "Configuration loaded"
        );
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
