//! Fetch client for the `/api/weather` proxy.
//!
//! Each call consults the shared cache first, then runs a single GET under the
//! retry policy and caches the parsed body.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use crate::cache::{cache_key, ExpiringCache};
use crate::error::{FetchError, FetchFailure};
use crate::retry::RetryPolicy;
use crate::types::{ForecastSeries, QueryKind, WeatherSnapshot};

/// Path of the proxy route, relative to the client's base URL
pub const PROXY_PATH: &str = "/api/weather";

pub const DEFAULT_CURRENT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_FORECAST_TTL: Duration = Duration::from_secs(10 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What the fetch client keeps in the shared cache
#[derive(Debug, Clone, PartialEq)]
pub enum CachedWeather {
    Current(WeatherSnapshot),
    Forecast(ForecastSeries),
}

pub type WeatherCache = ExpiringCache<CachedWeather>;

/// Error body returned by the proxy
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<WeatherCache>,
    retry: RetryPolicy,
    current_ttl: Duration,
    forecast_ttl: Duration,
}

impl WeatherClient {
    pub fn new(base_url: &str, cache: Arc<WeatherCache>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            retry: RetryPolicy::default(),
            current_ttl: DEFAULT_CURRENT_TTL,
            forecast_ttl: DEFAULT_FORECAST_TTL,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ttls(mut self, current: Duration, forecast: Duration) -> Self {
        self.current_ttl = current;
        self.forecast_ttl = forecast;
        self
    }

    pub fn cache(&self) -> &Arc<WeatherCache> {
        &self.cache
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Current conditions for `city`.
    ///
    /// With `use_cache` a live cache entry is returned without touching the
    /// network; without it the proxy is always called. Either way a successful
    /// response replaces the cache entry.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(
        &self,
        city: &str,
        use_cache: bool,
    ) -> Result<WeatherSnapshot, FetchFailure> {
        let city = validate_city(city)?;
        let key = cache_key(QueryKind::Current, city);

        if use_cache {
            if let Some(CachedWeather::Current(snapshot)) = self.cache.get(&key) {
                tracing::debug!("Using cached current weather data for {}", city);
                return Ok(snapshot);
            }
        }

        let snapshot: WeatherSnapshot = self.request(QueryKind::Current, city).await?;
        self.cache.set(
            key,
            CachedWeather::Current(snapshot.clone()),
            self.current_ttl,
        );
        Ok(snapshot)
    }

    /// Multi-day forecast for `city`. Same cache semantics as [`fetch_current`](Self::fetch_current).
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(
        &self,
        city: &str,
        use_cache: bool,
    ) -> Result<ForecastSeries, FetchFailure> {
        let city = validate_city(city)?;
        let key = cache_key(QueryKind::Forecast, city);

        if use_cache {
            if let Some(CachedWeather::Forecast(series)) = self.cache.get(&key) {
                tracing::debug!("Using cached forecast data for {}", city);
                return Ok(series);
            }
        }

        let series: ForecastSeries = self.request(QueryKind::Forecast, city).await?;
        self.cache.set(
            key,
            CachedWeather::Forecast(series.clone()),
            self.forecast_ttl,
        );
        Ok(series)
    }

    /// URL of the proxy query for `kind` and `city`
    pub fn query_url(&self, kind: QueryKind, city: &str) -> String {
        format!(
            "{}{}?city={}&type={}",
            self.base_url,
            PROXY_PATH,
            urlencoding::encode(city),
            kind
        )
    }

    async fn request<T: DeserializeOwned>(
        &self,
        kind: QueryKind,
        city: &str,
    ) -> Result<T, FetchFailure> {
        let url = self.query_url(kind, city);
        let url = url.as_str();

        self.retry
            .execute(move || self.get_once(url, kind))
            .await
            .map_err(|e| {
                tracing::error!(
                    transient = e.last_error().is_transient(),
                    "Giving up on {} for {}: {}",
                    kind,
                    city,
                    e
                );
                e
            })
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str, kind: QueryKind) -> Result<T, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| {
                    format!(
                        "Failed to fetch {} data: {}",
                        kind.noun(),
                        status.canonical_reason().unwrap_or(status.as_str())
                    )
                });
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

fn validate_city(city: &str) -> Result<&str, FetchFailure> {
    let city = city.trim();
    if city.is_empty() {
        return Err(FetchFailure::new(0, FetchError::InvalidCity));
    }
    Ok(city)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_json() -> serde_json::Value {
        serde_json::json!({
            "main": { "temp": 20, "feels_like": 22, "humidity": 60, "pressure": 1013,
                      "temp_min": 18, "temp_max": 23 },
            "weather": [{ "main": "Clear", "description": "clear sky", "icon": "01d" }],
            "wind": { "speed": 3.5, "deg": 180 },
            "name": "Seoul",
            "sys": { "country": "KR" }
        })
    }

    fn client(server: &MockServer) -> WeatherClient {
        WeatherClient::new(&server.uri(), Arc::new(WeatherCache::new()))
            .unwrap()
            .with_retry_policy(RetryPolicy::new(3, 1))
    }

    #[test]
    fn test_query_url_encodes_city() {
        let client =
            WeatherClient::new("http://localhost:3000/", Arc::new(WeatherCache::new())).unwrap();
        assert_eq!(
            client.query_url(QueryKind::Forecast, "New York"),
            "http://localhost:3000/api/weather?city=New%20York&type=forecast"
        );
        assert_eq!(
            client.query_url(QueryKind::Current, "서울"),
            "http://localhost:3000/api/weather?city=%EC%84%9C%EC%9A%B8&type=current"
        );
    }

    #[tokio::test]
    async fn test_fetch_current_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("city", "Seoul"))
            .and(query_param("type", "current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let snapshot = client.fetch_current("Seoul", true).await.unwrap();

        assert_eq!(snapshot.name, "Seoul");
        assert_eq!(snapshot.main.temp, 20.0);
        assert!(client.cache().has("current:seoul"));
    }

    #[tokio::test]
    async fn test_empty_city_is_rejected_without_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).fetch_current("   ", true).await.unwrap_err();

        assert_eq!(err.attempts(), 0);
        assert!(matches!(err.last_error(), FetchError::InvalidCity));
    }

    #[tokio::test]
    async fn test_error_message_from_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "Failed to fetch weather data",
                "details": "city not found"
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .fetch_current("Atlantis", true)
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 4);
        assert!(matches!(
            err.last_error(),
            FetchError::Upstream { status: 404, message } if message == "Failed to fetch weather data"
        ));
    }

    #[tokio::test]
    async fn test_error_message_falls_back_to_status_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .fetch_forecast("Seoul", true)
            .await
            .unwrap_err();

        assert_eq!(
            err.last_error().to_string(),
            "Failed to fetch forecast data: Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
            .expect(4)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let err = client.fetch_current("Seoul", true).await.unwrap_err();

        assert!(matches!(err.last_error(), FetchError::Parse(_)));
        assert!(!client.cache().has("current:seoul"), "no partial results cached");
    }
}
