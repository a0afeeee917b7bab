//! # configs
//!
//! Layered runtime settings:
//!
//! 1. built-in defaults (the `Default` impls below)
//! 2. `config/default.{toml,yaml,json}` if present
//! 3. `config/<COURTSIDE_ENV>.*` if present (`COURTSIDE_ENV` defaults to `development`)
//! 4. environment variables, `COURTSIDE__SECTION__KEY` (e.g. `COURTSIDE__SERVER__PORT=9000`)
//!
//! A `.env` file is read first, so anything above can also live there.

use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "COURTSIDE";
pub const ENV_SELECTOR: &str = "COURTSIDE_ENV";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub log_format: LogFormat,
    /// `RUST_LOG`-style directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout_secs: 30,
            log_format: LogFormat::Compact,
            log_filter: "info,tower_http=info,sqlx=warn".into(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Apply pending migrations at startup
    pub migrate: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { url: None, max_connections: 10, acquire_timeout_secs: 5, migrate: true }
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 shared secret of the identity provider
    pub jwt_secret: Option<SecretString>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_secs: u64,
    /// Upper bound on token verification per request
    pub verify_timeout_ms: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self { jwt_secret: None, issuer: None, audience: None, leeway_secs: 30, verify_timeout_ms: 2_000 }
    }
}

impl AuthSettings {
    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Directory for local uploads
    pub root: String,
    /// URL prefix the root is served under
    pub url_prefix: String,
    pub max_bytes: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            root: "./data/media".into(),
            url_prefix: "/media".into(),
            max_bytes: 5 * 1024 * 1024,
            timeout_secs: 15,
            max_retries: 2,
        }
    }
}

impl MediaSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    /// Platform cut of gross revenue, in percent
    pub commission_percent: u32,
    /// How often elapsed bookings are marked completed
    pub sweep_interval_secs: u64,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self { commission_percent: 10, sweep_interval_secs: 300 }
    }
}

impl BookingSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_store")]
    pub store: StoreKind,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub booking: BookingSettings,
}

fn default_environment() -> String {
    "development".into()
}

fn default_store() -> StoreKind {
    StoreKind::Memory
}

impl Settings {
    /// Loads `.env`, the config files for `COURTSIDE_ENV` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, ".env file could not be read");
            }
        }
        let environment = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| default_environment());

        let config = Config::builder()
            .set_default("environment", environment.as_str())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    /// Deserializes and validates an already assembled source stack.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret_len = self.auth.jwt_secret.as_ref().map_or(0, |s| s.expose_secret().len());
        if secret_len == 0 {
            return Err(ConfigError::Invalid("auth.jwt_secret must be set".into()));
        }
        if self.environment == "production" && secret_len < 32 {
            return Err(ConfigError::Invalid("auth.jwt_secret must be at least 32 bytes in production".into()));
        }
        if self.store == StoreKind::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Invalid("database.url is required when store = \"postgres\"".into()));
        }
        if self.booking.commission_percent > 100 {
            return Err(ConfigError::Invalid("booking.commission_percent must be between 0 and 100".into()));
        }
        if self.server.request_timeout_secs == 0 || self.booking.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("timeouts and intervals must be positive".into()));
        }
        if self.media.max_bytes == 0 {
            return Err(ConfigError::Invalid("media.max_bytes must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder().set_override("auth.jwt_secret", "test-secret").unwrap()
    }

    #[test]
    fn defaults_fill_every_section() {
        let settings = Settings::from_config(base().build().unwrap()).unwrap();
        assert_eq!(settings.store, StoreKind::Memory);
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.log_format, LogFormat::Compact);
        assert_eq!(settings.booking.commission_percent, 10);
        assert_eq!(settings.media.url_prefix, "/media");
        assert_eq!(settings.auth.verify_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = base()
            .set_override("server.port", 9000)
            .unwrap()
            .set_override("server.log_format", "json")
            .unwrap()
            .set_override("booking.commission_percent", 12)
            .unwrap()
            .build()
            .unwrap();
        let settings = Settings::from_config(config).unwrap();
        assert_eq!(settings.server.addr(), "0.0.0.0:9000");
        assert_eq!(settings.server.log_format, LogFormat::Json);
        assert_eq!(settings.booking.commission_percent, 12);
    }

    #[test]
    fn missing_secret_is_rejected() {
        let result = Settings::from_config(Config::builder().build().unwrap());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn postgres_store_requires_a_url() {
        let config = base().set_override("store", "postgres").unwrap().build().unwrap();
        assert!(matches!(Settings::from_config(config), Err(ConfigError::Invalid(_))));

        let config = base()
            .set_override("store", "postgres")
            .unwrap()
            .set_override("database.url", "postgres://localhost/courtside")
            .unwrap()
            .build()
            .unwrap();
        let settings = Settings::from_config(config).unwrap();
        assert_eq!(
            settings.database.url.as_ref().map(|u| u.expose_secret().to_string()).as_deref(),
            Some("postgres://localhost/courtside")
        );
    }

    #[test]
    fn production_requires_a_long_secret() {
        let config = base().set_override("environment", "production").unwrap().build().unwrap();
        assert!(matches!(Settings::from_config(config), Err(ConfigError::Invalid(_))));
    }
}
