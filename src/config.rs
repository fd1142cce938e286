//! Secrets / settings file.
//!
//! Shaped like a Streamlit `secrets.toml`: a `[snowflake]` table with the
//! connection parameters and an optional `[cache]` table.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SnowChartError};

/// Default secrets file, relative to the working directory
pub const DEFAULT_SECRETS_PATH: &str = "secrets.toml";

/// Environment variable overriding the secrets file location
pub const SECRETS_ENV_VAR: &str = "SNOW_CHART_SECRETS";

fn default_token_type() -> TokenType {
    TokenType::ProgrammaticAccessToken
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_statement_timeout_secs() -> u64 {
    300
}

fn default_ttl_secs() -> u64 {
    600
}

/// How the bearer token is interpreted by Snowflake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    Oauth,
    ProgrammaticAccessToken,
}

impl TokenType {
    /// Value of the `X-Snowflake-Authorization-Token-Type` header
    pub fn as_header(&self) -> &'static str {
        match self {
            TokenType::Oauth => "OAUTH",
            TokenType::ProgrammaticAccessToken => "PROGRAMMATIC_ACCESS_TOKEN",
        }
    }
}

/// `[snowflake]` connection parameters
#[derive(Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Account identifier, e.g. `xy12345.eu-central-1`
    pub account: String,

    /// Full base URL; defaults to `https://<account>.snowflakecomputing.com`
    #[serde(default)]
    pub host: Option<String>,

    pub token: String,

    #[serde(default = "default_token_type")]
    pub token_type: TokenType,

    #[serde(default)]
    pub warehouse: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    /// HTTP client timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Server-side statement timeout
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
}

impl SnowflakeSettings {
    pub fn base_url(&self) -> String {
        match self.host.as_deref().map(str::trim) {
            Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
                host.trim_end_matches('/').to_string()
            }
            Some(host) if !host.is_empty() => format!("https://{}", host.trim_end_matches('/')),
            _ => format!("https://{}.snowflakecomputing.com", self.account),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Keep the token out of logs
impl fmt::Debug for SnowflakeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeSettings")
            .field("account", &self.account)
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("timeout_secs", &self.timeout_secs)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

/// `[cache]` settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// SQLite file for a persistent cache; in-memory when absent
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            path: None,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// SQLite path for commands that inspect the cache from a separate process.
    ///
    /// The in-memory cache dies with its process, so there is nothing to inspect without one.
    pub fn persistent_path(&self) -> Result<&str> {
        match self.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Ok(path),
            _ => Err(SnowChartError::Configuration(
                "no persistent cache: set [cache].path or pass --cache".to_string(),
            )),
        }
    }
}

/// Everything read from the secrets file
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub snowflake: SnowflakeSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl Settings {
    /// Pick the secrets file: explicit path, then `SNOW_CHART_SECRETS`, then the default
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var(SECRETS_ENV_VAR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH))
    }

    /// Read and validate a secrets file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SnowChartError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| SnowChartError::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.snowflake.account.trim().is_empty() {
            return Err(SnowChartError::Configuration(
                "snowflake.account must not be empty".to_string(),
            ));
        }
        if self.snowflake.token.trim().is_empty() {
            return Err(SnowChartError::Configuration(
                "snowflake.token must not be empty".to_string(),
            ));
        }
        if self.snowflake.timeout_secs == 0 {
            return Err(SnowChartError::Configuration(
                "snowflake.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
