//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend origin.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Default per-request timeout: 10 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of automatic re-initializations after a scan error.
pub const DEFAULT_SCAN_MAX_RETRIES: u32 = 3;

/// Default pause before re-initializing the decoder: 1.5 seconds.
pub const DEFAULT_SCAN_RETRY_DELAY_MS: u64 = 1500;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("No data directory available; set ARMORY_DATA_DIR")]
    NoDataDir,
}

/// Retry policy of the scan controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanSettings {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_SCAN_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_SCAN_RETRY_DELAY_MS),
        }
    }
}

/// Configuration for the Armory client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://127.0.0.1:8000`.
    pub backend_url: Url,
    /// Timeout applied to every backend request.
    pub request_timeout: Duration,
    /// Directory holding the durable session scope.
    pub data_dir: PathBuf,
    pub scan: ScanSettings,
}

impl ClientConfig {
    /// Configuration pointing at `backend_url` with all other defaults.
    pub fn new(backend_url: &str, data_dir: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            backend_url: parse_backend_url(backend_url)?,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            data_dir,
            scan: ScanSettings::default(),
        })
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                      | Default                       |
    /// |-------------------------------|-------------------------------|
    /// | `ARMORY_BACKEND_URL`          | `http://127.0.0.1:8000`       |
    /// | `ARMORY_TIMEOUT_SECS`         | `10`                          |
    /// | `ARMORY_DATA_DIR`             | `<platform data dir>/armory`  |
    /// | `ARMORY_SCAN_MAX_RETRIES`     | `3`                           |
    /// | `ARMORY_SCAN_RETRY_DELAY_MS`  | `1500`                        |
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url =
            std::env::var("ARMORY_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.into());
        let data_dir = match std::env::var("ARMORY_DATA_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir().ok_or(ConfigError::NoDataDir)?.join("armory"),
        };
        Ok(Self {
            backend_url: parse_backend_url(&backend_url)?,
            request_timeout: Duration::from_secs(env_number(
                "ARMORY_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            data_dir,
            scan: ScanSettings {
                max_retries: env_number("ARMORY_SCAN_MAX_RETRIES", DEFAULT_SCAN_MAX_RETRIES)?,
                retry_delay: Duration::from_millis(env_number(
                    "ARMORY_SCAN_RETRY_DELAY_MS",
                    DEFAULT_SCAN_RETRY_DELAY_MS,
                )?),
            },
        })
    }

    /// Replace the backend origin.
    pub fn with_backend_url(mut self, backend_url: &str) -> Result<Self, ConfigError> {
        self.backend_url = parse_backend_url(backend_url)?;
        Ok(self)
    }

    /// File backing the durable session scope.
    pub fn durable_scope_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(raw.to_string(), e))
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value,
                })
        }
        _ => Ok(default),
    }
}
