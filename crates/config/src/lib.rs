//! Configuration loading, validation, and management for triad.
//!
//! Loads settings from `configs/{ENVIRONMENT}.yaml` (TOML is accepted too,
//! chosen by file extension), applies environment variable overrides and
//! validates everything at startup. A missing file is created with the
//! defaults so the next run has something to edit.
//!
//! The resulting [`Settings`] value is built once and handed to every
//! component constructor; nothing reads configuration from a global.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Accepted `log_level` values (after upper-casing).
pub const VALID_LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Environment variables that override file values, one per field.
pub const ENV_OVERRIDES: [&str; 9] = [
    "ENVIRONMENT",
    "DEBUG",
    "LOG_LEVEL",
    "ENABLE_MONITORING",
    "DATABASE_URL",
    "MAX_WORKERS",
    "TIMEOUT_SECONDS",
    "ENABLE_VALIDATION",
    "VALIDATION_TIMEOUT",
];

/// The root settings structure.
///
/// Maps directly to `configs/<environment>.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Deployment environment name (development, staging, production, ...)
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub debug: bool,

    /// One of DEBUG / INFO / WARNING / ERROR / CRITICAL
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub enable_monitoring: bool,

    /// Declared for completeness; the core never connects anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Declared, not enforced.
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,

    /// Base unit for the audit TTLs written by the pillars.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,

    #[serde(default = "default_true")]
    pub enable_validation: bool,

    /// Declared, not enforced.
    #[serde(default = "default_validation_timeout")]
    pub validation_timeout: u32,
}

fn default_environment() -> String {
    "development".into()
}
fn default_log_level() -> String {
    "INFO".into()
}
fn default_true() -> bool {
    true
}
fn default_max_workers() -> u32 {
    4
}
fn default_timeout_seconds() -> u32 {
    30
}
fn default_validation_timeout() -> u32 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            debug: false,
            log_level: default_log_level(),
            enable_monitoring: true,
            database_url: None,
            max_workers: default_max_workers(),
            timeout_seconds: default_timeout_seconds(),
            enable_validation: true,
            validation_timeout: default_validation_timeout(),
        }
    }
}

impl Settings {
    /// Load from the default path, using the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific file path, using the process environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_from_with(path, |key| std::env::var(key).ok())
    }

    /// Load from `path`, resolving overrides through `lookup`.
    ///
    /// Precedence: defaults < file values < overrides.
    pub fn load_from_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !path.exists() {
            tracing::info!("No config file found at {}, creating defaults", path.display());
            Self::write_defaults(path, &lookup)?;
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut settings = Self::parse(path, &content)?;
        settings.apply_env_overrides_with(&lookup)?;
        settings.log_level = settings.log_level.to_uppercase();
        settings.validate()?;

        tracing::debug!(
            environment = %settings.environment,
            path = %path.display(),
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Re-read the file this configuration came from.
    pub fn reload(&mut self, path: &Path) -> Result<(), ConfigError> {
        *self = Self::load_from(path)?;
        Ok(())
    }

    /// `configs/{ENVIRONMENT}.yaml`, defaulting to `development`.
    pub fn default_path() -> PathBuf {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| default_environment());
        Self::path_for_environment(&env)
    }

    pub fn path_for_environment(environment: &str) -> PathBuf {
        PathBuf::from("configs").join(format!("{environment}.yaml"))
    }

    /// Apply every recognized override that `lookup` resolves.
    ///
    /// Booleans accept `true`/`1`/`yes`/`on` (case-insensitive); anything
    /// else is `false`. Integers must parse or the whole load fails.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for var in ENV_OVERRIDES {
            let Some(value) = lookup(var) else {
                continue;
            };
            match var {
                "ENVIRONMENT" => self.environment = value,
                "DEBUG" => self.debug = parse_bool(&value),
                "LOG_LEVEL" => self.log_level = value,
                "ENABLE_MONITORING" => self.enable_monitoring = parse_bool(&value),
                "DATABASE_URL" => self.database_url = Some(value),
                "MAX_WORKERS" => self.max_workers = parse_int(var, &value)?,
                "TIMEOUT_SECONDS" => self.timeout_seconds = parse_int(var, &value)?,
                "ENABLE_VALIDATION" => self.enable_validation = parse_bool(&value),
                "VALIDATION_TIMEOUT" => self.validation_timeout = parse_int(var, &value)?,
                _ => unreachable!("unhandled override {var}"),
            }
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.log_level.to_uppercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of {}, got '{}'",
                VALID_LOG_LEVELS.join(", "),
                self.log_level
            )));
        }
        for (name, value) in [
            ("max_workers", self.max_workers),
            ("timeout_seconds", self.timeout_seconds),
            ("validation_timeout", self.validation_timeout),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }

    /// `timeout_seconds × multiplier`, the TTL unit used for audit records.
    pub fn ttl(&self, multiplier: i64) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.timeout_seconds) * multiplier)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// The `tracing` filter directive matching `log_level`.
    pub fn tracing_directive(&self) -> &'static str {
        match self.log_level.to_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }

    /// Render these settings as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::WriteError {
            path: PathBuf::from("<memory>"),
            reason: e.to_string(),
        })
    }

    // ── Internal ───────────────────────────────────────────────────

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parse_error = |reason: String| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason,
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
            _ => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Write a defaults file, seeding environment/debug/log level from the
    /// environment the way a first run would see them.
    fn write_defaults<F>(path: &Path, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut defaults = Self::default();
        if let Some(env) = lookup("ENVIRONMENT") {
            defaults.environment = env;
        }
        if let Some(debug) = lookup("DEBUG") {
            defaults.debug = parse_bool(&debug);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            defaults.log_level = level;
        }

        let write_error = |reason: String| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
        let body = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(&defaults).map_err(|e| write_error(e.to_string()))?
            }
            _ => defaults.to_yaml()?,
        };
        std::fs::write(path, body).map_err(|e| write_error(e.to_string()))
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn parse_int(var: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Invalid integer value for {var}: {value}")]
    InvalidEnv { var: String, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for triad_core::Error {
    fn from(e: ConfigError) -> Self {
        Self::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_map(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.environment, "development");
        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.max_workers, 4);
        assert_eq!(settings.timeout_seconds, 30);
        assert_eq!(settings.validation_timeout, 60);
        assert!(settings.enable_monitoring);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn invalid_log_level_rejected() {
        let settings = Settings {
            log_level: "VERBOSE".into(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn zero_workers_rejected() {
        let settings = Settings {
            max_workers: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_config_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs").join("development.yaml");

        let settings = Settings::load_from_with(&path, no_env).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("timeout_seconds: 30"));
    }

    #[test]
    fn yaml_file_values_are_read_and_level_upper_cased() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging.yaml");
        std::fs::write(
            &path,
            "environment: staging\nlog_level: debug\nmax_workers: 8\n",
        )
        .unwrap();

        let settings = Settings::load_from_with(&path, no_env).unwrap();
        assert_eq!(settings.environment, "staging");
        assert_eq!(settings.log_level, "DEBUG");
        assert_eq!(settings.max_workers, 8);
        assert_eq!(settings.timeout_seconds, 30);
    }

    #[test]
    fn toml_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "environment = \"production\"\ntimeout_seconds = 10\n").unwrap();

        let settings = Settings::load_from_with(&path, no_env).unwrap();
        assert!(settings.is_production());
        assert_eq!(settings.timeout_seconds, 10);
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("development.yaml");
        std::fs::write(&path, "debug: false\nmax_workers: 2\n").unwrap();

        let env = env_map(&[
            ("LOG_LEVEL", "DEBUG"),
            ("DEBUG", "Yes"),
            ("MAX_WORKERS", "10"),
            ("DATABASE_URL", "postgresql://db/triad"),
            ("ENABLE_MONITORING", "off"),
        ]);
        let settings = Settings::load_from_with(&path, env).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "DEBUG");
        assert_eq!(settings.max_workers, 10);
        assert_eq!(settings.database_url.as_deref(), Some("postgresql://db/triad"));
        assert!(!settings.enable_monitoring);
    }

    #[test]
    fn non_numeric_env_integer_is_fatal() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_overrides_with(env_map(&[("TIMEOUT_SECONDS", "soon")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid integer value for TIMEOUT_SECONDS: soon");

        let lifted: triad_core::Error = err.into();
        assert!(matches!(lifted, triad_core::Error::Config { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "max_workers: [1, 2\n").unwrap();
        assert!(matches!(
            Settings::load_from_with(&path, no_env),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn ttl_scales_timeout() {
        let settings = Settings {
            timeout_seconds: 7,
            ..Settings::default()
        };
        assert_eq!(settings.ttl(3), TimeDelta::seconds(21));
    }

    #[test]
    fn log_levels_map_to_tracing_directives() {
        let mut settings = Settings::default();
        assert_eq!(settings.tracing_directive(), "info");
        settings.log_level = "WARNING".into();
        assert_eq!(settings.tracing_directive(), "warn");
        settings.log_level = "CRITICAL".into();
        assert_eq!(settings.tracing_directive(), "error");
    }

    #[test]
    fn path_follows_environment_name() {
        assert_eq!(
            Settings::path_for_environment("staging"),
            PathBuf::from("configs/staging.yaml")
        );
    }
}
