use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable that overrides `upstream.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Upper bound for cache lifetimes and the sweep period, in seconds (7 days)
pub const MAX_CACHE_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for the auto-refresh interval, in minutes (7 days)
pub const MAX_REFRESH_MINUTES: u64 = 7 * 24 * 60;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (preferences live here too)
    pub config_dir: PathBuf,

    /// Where the dashboard finds the proxy, and where `serve` binds it
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Upstream weather provider used by the proxy
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Client-side cache lifetimes
    #[serde(default)]
    pub cache: CacheConfig,

    /// Backoff policy around proxy calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Auto-refresh settings
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL the fetch client talks to
    pub base_url: String,

    /// Socket address the proxy server binds
    pub bind: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// OpenWeatherMap API root
    pub base_url: String,

    /// Server-held API key. Never sent to the dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_timeout() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            api_key: None,
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl UpstreamConfig {
    /// The effective API key: environment first, then the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub current_ttl_secs: u64,
    pub forecast_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            current_ttl_secs: 5 * 60,
            forecast_ttl_secs: 10 * 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}

/// Durations past [`MAX_CACHE_SECS`] are clamped to it.
impl CacheConfig {
    pub fn current_ttl(&self) -> Duration {
        Duration::from_secs(self.current_ttl_secs.min(MAX_CACHE_SECS))
    }

    pub fn forecast_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_ttl_secs.min(MAX_CACHE_SECS))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.min(MAX_CACHE_SECS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each attempt)
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Auto-refresh interval in minutes
    pub interval_minutes: u64,

    /// City shown on startup
    pub default_city: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            default_city: "Seoul".to_string(),
        }
    }
}

impl RefreshConfig {
    /// Clamped to [`MAX_REFRESH_MINUTES`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.min(MAX_REFRESH_MINUTES) * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weatherdash");

        Self {
            config_dir,
            proxy: ProxyConfig::default(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.proxy.base_url, "proxy.base_url", &mut result);
        self.validate_url(&self.upstream.base_url, "upstream.base_url", &mut result);

        if self.proxy.bind.parse::<std::net::SocketAddr>().is_err() {
            result.add_error(
                "proxy.bind",
                format!("Not a socket address: {}", self.proxy.bind),
            );
        }

        if self.upstream.resolved_api_key().is_none() {
            result.add_warning(
                "upstream.api_key",
                format!("No API key configured (set {API_KEY_ENV}); the proxy will answer 500"),
            );
        }

        if self.upstream.timeout_secs == 0 {
            result.add_error("upstream.timeout_secs", "Timeout must be greater than 0");
        }

        for (field, secs) in [
            ("cache.current_ttl_secs", self.cache.current_ttl_secs),
            ("cache.forecast_ttl_secs", self.cache.forecast_ttl_secs),
            ("cache.sweep_interval_secs", self.cache.sweep_interval_secs),
        ] {
            if secs == 0 {
                result.add_error(field, "Must be greater than 0");
            } else if secs > MAX_CACHE_SECS {
                result.add_error(field, format!("Must be at most {MAX_CACHE_SECS} seconds"));
            }
        }

        if self.retry.max_attempts == 0 {
            result.add_error("retry.max_attempts", "At least one retry is required");
        } else if self.retry.max_attempts > 10 {
            result.add_warning(
                "retry.max_attempts",
                "More than 10 retries; the last backoff delay will be very long",
            );
        }
        if self.retry.base_delay_ms == 0 {
            result.add_error("retry.base_delay_ms", "Base delay must be greater than 0");
        }

        if self.refresh.interval_minutes == 0 {
            result.add_error("refresh.interval_minutes", "Refresh interval must be greater than 0");
        } else if self.refresh.interval_minutes > MAX_REFRESH_MINUTES {
            result.add_error(
                "refresh.interval_minutes",
                format!("Refresh interval must be at most {MAX_REFRESH_MINUTES} minutes"),
            );
        } else if self.refresh.interval_minutes > 1440 {
            result.add_warning(
                "refresh.interval_minutes",
                "Refresh interval is more than 24 hours",
            );
        }

        if self.refresh.default_city.trim().is_empty() {
            result.add_warning("refresh.default_city", "No default city; pass one on the command line");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the preference file used by the UI state store
    pub fn preferences_path(&self) -> PathBuf {
        self.config_dir.join("preferences.json")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("weatherdash");

        Ok(config_dir.join("config.toml"))
    }
}
