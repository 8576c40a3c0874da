//! Weather data layer for weatherdash
//!
//! Fetches current conditions and forecasts through the proxy, with an
//! expiring in-memory cache and exponential-backoff retries.

pub mod cache;
pub mod client;
pub mod error;
pub mod forecast;
pub mod format;
pub mod retry;
pub mod types;

pub use cache::{cache_key, CacheEntry, CacheStats, ExpiringCache};
pub use client::{
    CachedWeather, WeatherCache, WeatherClient, DEFAULT_CURRENT_TTL, DEFAULT_FORECAST_TTL,
};
pub use error::{FetchError, FetchFailure};
pub use forecast::{daily_summary, next_hours, DailyForecast, NEXT_DAY_STEPS};
pub use format::{format_last_updated, format_temperature, icon_url};
pub use retry::{with_retry, RetryError, RetryPolicy};
pub use types::*;
