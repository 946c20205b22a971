//! Runtime configuration.
//!
//! Values come from the process environment (after `.env.local` / `.env`
//! are loaded by `run()`), and CLI flags override them.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOCATION_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CAPTURE_INTERVAL_SECS: u64 = 300;

/// Settings for talking to the classification service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    base_url: String,
    /// `None` leaves reqwest's default (no explicit timeout).
    pub request_timeout: Option<Duration>,
}

impl ApiConfig {
    /// Build from a base URL, rejecting anything that doesn't parse.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        parse_base_url("API_URL", base_url).map(|base_url| Self {
            base_url,
            request_timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path such as `predict`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Everything the CLI needs, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiConfig,
    pub location_timeout: Duration,
    pub capture_interval: Duration,
    pub history_file: PathBuf,
}

impl Settings {
    /// Read settings from the current environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let request_timeout = optional_seconds("API_TIMEOUT_SECS")?;
        let api = ApiConfig::new(&api_url)?.with_timeout(request_timeout);

        let location_timeout = optional_seconds("LOCATION_TIMEOUT_SECS")?
            .unwrap_or(Duration::from_secs(DEFAULT_LOCATION_TIMEOUT_SECS));
        let capture_interval = optional_seconds("CAPTURE_INTERVAL")?
            .unwrap_or(Duration::from_secs(DEFAULT_CAPTURE_INTERVAL_SECS));

        let history_file = match std::env::var("SCAN_HISTORY_FILE") {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => default_history_file(),
        };

        log::info!(
            "[CONFIG] API: {} (timeout: {:?})",
            api.base_url(),
            api.request_timeout
        );

        Ok(Self {
            api,
            location_timeout,
            capture_interval,
            history_file,
        })
    }
}

/// `<data dir>/blight-scan/scans.json`, falling back to the working dir.
pub fn default_history_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("blight-scan")
        .join("scans.json")
}

fn parse_base_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            var,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

fn optional_seconds(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => parse_seconds(var, &raw).map(Some),
        _ => Ok(None),
    }
}

pub(crate) fn parse_seconds(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds {
            var,
            value: raw.to_string(),
        }),
    }
}
