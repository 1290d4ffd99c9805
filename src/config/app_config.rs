use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::rate_limit::RateLimitConfig;
use crate::infrastructure::services::{CacheServiceConfig, RevocationConfig};
use crate::infrastructure::store::StoreConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheServiceConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub revocation: RevocationConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Admission middleware settings
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path prefixes that bypass limiting entirely
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,
    /// Use the first `X-Forwarded-For` entry instead of the peer address.
    /// Enable only behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdminConfig {
    /// Bearer token for the admin routes; unset disables them
    #[serde(default)]
    pub token: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_exempt_paths() -> Vec<String> {
    ["/health", "/ready", "/live", "/docs", "/static", "/favicon.ico"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exempt_paths: default_exempt_paths(),
            trust_forwarded_for: false,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Rejects settings that would silently admit or block all traffic
    pub fn validate(&self) -> Result<(), DomainError> {
        self.store.validate()?;
        self.cache.validate()?;
        self.rate_limit.validate()?;
        self.revocation.validate()?;

        if let Some(path) = self
            .admission
            .exempt_paths
            .iter()
            .find(|path| !path.starts_with('/'))
        {
            return Err(DomainError::configuration(format!(
                "admission.exempt_paths entry '{}' must start with '/'",
                path
            )));
        }

        if self.admin.token.as_deref().is_some_and(str::is_empty) {
            return Err(DomainError::configuration(
                "admin.token must not be empty when set",
            ));
        }

        Ok(())
    }
}
