use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Layered sources, later ones win:
// 1. `food_delivery.{toml,yaml,json}` in the working directory (optional), or
//    the file named by `FOOD_DELIVERY_CONFIG` (required when set)
// 2. Environment variables prefixed `FOOD_DELIVERY__`, with `__` between
//    nested keys (e.g. `FOOD_DELIVERY__AUTH__JWT_SECRET` -> `auth.jwt_secret`)
//
// ============================================================================

pub const CONFIG_PATH_VAR: &str = "FOOD_DELIVERY_CONFIG";
pub const ENV_PREFIX: &str = "FOOD_DELIVERY";
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("auth.jwt_secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    WeakSecret(usize),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// actix worker threads, one per core when unset
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string. Without it everything is kept in memory.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connect_attempts: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connect_attempts: 5,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

fn default_issuer() -> String {
    "food-delivery".to_string()
}

fn default_token_ttl() -> i64 {
    60
}

fn default_password_iterations() -> u32 {
    100_000
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("password_iterations", &self.password_iterations)
            .finish()
    }
}

/// Seeds a platform administrator at startup when both fields are set
#[derive(Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Load from the optional config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                tracing::info!(path = %path, "Loading config file");
                File::with_name(&path).required(true)
            }
            Err(_) => File::with_name("food_delivery").required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config)
    }

    /// Deserialize and validate an already-built configuration
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret(self.auth.jwt_secret.len()));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_minutes must be positive".into()));
        }
        if self.auth.password_iterations == 0 {
            return Err(ConfigError::Invalid("auth.password_iterations must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        if self.bootstrap.admin_email.is_some() != self.bootstrap.admin_password.is_some() {
            return Err(ConfigError::Invalid(
                "bootstrap.admin_email and bootstrap.admin_password must be set together".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
