//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `UDFCAT_DB_PATH` | `udfcat.db` |
//! | `UDFCAT_PORT` | `3000` |
//! | `UDFCAT_SYMBOL_MANIFEST` | unset (empty manifest) |
//! | `UDFCAT_STORE_TIMEOUT_MS` | `10000` |

use std::path::PathBuf;
use std::time::Duration;

/// Errors from reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// SQLite metastore file.
    pub db_path: String,
    pub port: u16,
    /// JSON symbol manifest describing libraries and archives.
    pub symbol_manifest: Option<PathBuf>,
    /// Upper bound on a single metastore call.
    pub store_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            db_path: "udfcat.db".to_string(),
            port: 3000,
            symbol_manifest: None,
            store_timeout: Duration::from_millis(10_000),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which returns a variable's
    /// value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();

        if let Some(path) = lookup("UDFCAT_DB_PATH") {
            if path.trim().is_empty() {
                return Err(invalid("UDFCAT_DB_PATH", path, "must not be empty"));
            }
            config.db_path = path;
        }
        if let Some(port) = lookup("UDFCAT_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("UDFCAT_PORT", port.clone(), e))?;
        }
        if let Some(manifest) = lookup("UDFCAT_SYMBOL_MANIFEST") {
            if !manifest.trim().is_empty() {
                config.symbol_manifest = Some(PathBuf::from(manifest));
            }
        }
        if let Some(timeout) = lookup("UDFCAT_STORE_TIMEOUT_MS") {
            let millis: u64 = timeout.trim().parse().map_err(|e: std::num::ParseIntError| {
                invalid("UDFCAT_STORE_TIMEOUT_MS", timeout.clone(), e)
            })?;
            if millis == 0 {
                return Err(invalid("UDFCAT_STORE_TIMEOUT_MS", timeout, "must be positive"));
            }
            config.store_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

fn invalid(var: &'static str, value: String, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        reason: reason.to_string(),
    }
}
