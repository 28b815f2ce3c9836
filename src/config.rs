//! Runtime configuration.
//!
//! Loaded from environment variables at startup. A `.env` file in the working
//! directory is honoured for local runs.

use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_DB_PATH: &str = "auth_logs.db";
pub const DEFAULT_PASSWORD_SALT: &str = "some_static_salt_change_me";
pub const DEFAULT_MODEL_PATH: &str = "house_price_model.json";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: PathBuf,
    /// Process-wide salt shared by every password hash.
    pub password_salt: String,
    pub model_path: PathBuf,
    pub history_limit: usize,
    /// Raw `RUST_LOG` directives, e.g. `house_valuation=debug,warn`.
    pub log_filter: String,
    /// Used when the filter cannot be built at subscriber setup.
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            password_salt: DEFAULT_PASSWORD_SALT.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_level: Level::INFO,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Keep tests hermetic.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let db_path = lookup("VALUATION_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let password_salt = match lookup("VALUATION_PASSWORD_SALT") {
            Some(salt) if salt.is_empty() => {
                return Err(ConfigError::InvalidValue(
                    "VALUATION_PASSWORD_SALT".to_string(),
                    "salt must not be empty".to_string(),
                ))
            }
            Some(salt) => salt,
            None => defaults.password_salt,
        };

        let model_path = lookup("VALUATION_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let history_limit = match lookup("VALUATION_HISTORY_LIMIT") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidValue(
                        "VALUATION_HISTORY_LIMIT".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    ))
                }
                Ok(limit) => limit,
            },
            None => defaults.history_limit,
        };

        let log_filter = lookup("RUST_LOG").unwrap_or(defaults.log_filter);
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&log_filter) {
            return Err(ConfigError::InvalidValue("RUST_LOG".to_string(), e.to_string()));
        }
        let log_level = log_filter.parse::<Level>().unwrap_or(defaults.log_level);

        Ok(Self {
            db_path,
            password_salt,
            model_path,
            history_limit,
            log_filter,
            log_level,
        })
    }
}
