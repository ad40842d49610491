//! Configuration loading and typed config structures for the personality.
//!
//! The canonical configuration lives in `rowantree-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure and a
//! loader that reads, overrides from the environment, and validates it.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `rowantree-config.yaml`. Every section has
/// defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Directory locations.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// User-state database connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Loremaster (event generator) endpoint.
    #[serde(default)]
    pub loremaster: LoremasterConfig,

    /// Encounter odds and tick pacing.
    #[serde(default)]
    pub personality: PersonalityConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `LOGS_DIR` overrides `directory.logs_dir`
    /// - `DATABASE_SERVER` overrides `database.server`
    /// - `DATABASE_NAME` overrides `database.name`
    /// - `DATABASE_USERNAME` overrides `database.username`
    /// - `DATABASE_PASSWORD` overrides `database.password`
    /// - `LOREMASTER_URL` overrides `loremaster.url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment. Still validates.
    ///
    /// # Errors
    ///
    /// Same as [`Config::parse`].
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document means all defaults.
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Override values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override values from an arbitrary key lookup.
    ///
    /// [`Config::apply_env_overrides`] passes the process environment; tests
    /// pass a map.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("LOGS_DIR") {
            self.directory.logs_dir = val;
        }
        if let Some(val) = lookup("DATABASE_SERVER") {
            self.database.server = val;
        }
        if let Some(val) = lookup("DATABASE_NAME") {
            self.database.name = val;
        }
        if let Some(val) = lookup("DATABASE_USERNAME") {
            self.database.username = val;
        }
        if let Some(val) = lookup("DATABASE_PASSWORD") {
            self.database.password = val;
        }
        if let Some(val) = lookup("LOREMASTER_URL") {
            self.loremaster.url = val;
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.personality.validate()
    }
}

/// Directory locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryConfig {
    /// Where the engine writes its JSON log file.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
        }
    }
}

/// User-state database connection settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    #[serde(default = "default_database_server")]
    pub server: String,

    /// Database port.
    #[serde(default = "default_database_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Login user.
    #[serde(default = "default_database_username")]
    pub username: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

// Keeps the password out of logs.
impl core::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            server: default_database_server(),
            port: default_database_port(),
            name: default_database_name(),
            username: default_database_username(),
            password: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

/// Loremaster endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoremasterConfig {
    /// Base URL of the loremaster service.
    #[serde(default = "default_loremaster_url")]
    pub url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for LoremasterConfig {
    fn default() -> Self {
        Self {
            url: default_loremaster_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Encounter odds and tick pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PersonalityConfig {
    /// Percent chance (0-100) that an active user gets an encounter each tick.
    #[serde(default = "default_encounter_odds")]
    pub encounter_odds: u32,

    /// Shortest nap between ticks, in seconds.
    #[serde(default = "default_min_nap_seconds")]
    pub min_nap_seconds: u64,

    /// Longest nap between ticks, in seconds.
    #[serde(default = "default_max_nap_seconds")]
    pub max_nap_seconds: u64,

    /// Stop after this many ticks (0 = run until stopped).
    #[serde(default)]
    pub max_ticks: u64,
}

impl PersonalityConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for odds above 100, a zero nap bound,
    /// or a minimum nap above the maximum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.encounter_odds > 100 {
            return Err(ConfigError::Invalid(format!(
                "personality.encounter_odds must be within 0..=100, got {}",
                self.encounter_odds
            )));
        }
        if self.min_nap_seconds == 0 {
            return Err(ConfigError::Invalid(
                "personality.min_nap_seconds must be at least 1".to_owned(),
            ));
        }
        if self.max_nap_seconds == 0 {
            return Err(ConfigError::Invalid(
                "personality.max_nap_seconds must be at least 1".to_owned(),
            ));
        }
        if self.min_nap_seconds > self.max_nap_seconds {
            return Err(ConfigError::Invalid(format!(
                "personality.min_nap_seconds ({}) exceeds max_nap_seconds ({})",
                self.min_nap_seconds, self.max_nap_seconds
            )));
        }
        Ok(())
    }
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            encounter_odds: default_encounter_odds(),
            min_nap_seconds: default_min_nap_seconds(),
            max_nap_seconds: default_max_nap_seconds(),
            max_ticks: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write JSON logs to `<logs_dir>/rowantree-personality.log`.
    #[serde(default = "default_true")]
    pub json_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_file: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_logs_dir() -> String {
    "logs".to_owned()
}

fn default_database_server() -> String {
    "localhost".to_owned()
}

const fn default_database_port() -> u16 {
    5432
}

fn default_database_name() -> String {
    "rowantree".to_owned()
}

fn default_database_username() -> String {
    "rowantree".to_owned()
}

const fn default_max_connections() -> u32 {
    10
}

fn default_loremaster_url() -> String {
    "http://localhost:8000".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    5000
}

const fn default_encounter_odds() -> u32 {
    10
}

const fn default_min_nap_seconds() -> u64 {
    1
}

const fn default_max_nap_seconds() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
