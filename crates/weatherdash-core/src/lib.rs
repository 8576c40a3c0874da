pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{
    CacheConfig, Config, ProxyConfig, RefreshConfig, RetryConfig, UpstreamConfig,
    ValidationResult, API_KEY_ENV, MAX_CACHE_SECS, MAX_REFRESH_MINUTES,
};
pub use error::{AppError, NetworkError, ReqwestErrorExt, WeatherError};

use anyhow::Result;

/// Initialize logging. Safe to call more than once.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("weatherdash core initialized");
    Ok(())
}
