//! # configs
//!
//! Layered application configuration: struct defaults, then an optional
//! `config/*.toml` file, then `APP_*` environment variables (double
//! underscore separates sections, e.g. `APP_HTTP__PORT=8080`). Secrets
//! stay wrapped in `SecretString` so they never land in debug output.

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("store.backend is 'postgres' but store.database_url is not set")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<SecretString>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::from("dev-secret-change-me".to_string()),
            token_ttl_secs: 86_400,
        }
    }
}

/// Engagement and policy knobs. The star bounds and the transition
/// strictness are configuration by design, not hardcoded logic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub star_min: i32,
    pub star_max: i32,
    pub strict_transitions: bool,
    pub moderator_role: String,
    pub submit_user_types: Vec<String>,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            star_min: 1,
            star_max: 5,
            strict_transitions: false,
            moderator_role: "admin".to_string(),
            submit_user_types: vec!["student".to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub engagement: EngagementConfig,
}

impl AppConfig {
    /// Loads configuration from the optional file layer plus `APP_*`
    /// environment overrides, falling back to struct defaults.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine; variables may come from the real env.
        dotenvy::dotenv().ok();
        let raw = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;
        let cfg: AppConfig = raw.try_deserialize()?;

        if cfg.store.backend == StoreBackend::Postgres && cfg.store.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if cfg.auth.token_ttl_secs <= 0 {
            warn!("auth.token_ttl_secs is not positive; issued tokens expire immediately");
        }
        Ok(cfg)
    }
}
