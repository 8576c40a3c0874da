//! Client for the OpenWeatherMap REST API.
//!
//! Holds the server-side API key. The key goes out as the `appid` query
//! parameter and is stripped from every error before it can reach a log line.

use std::time::Duration;

use serde::Deserialize;
use weatherdash_core::config::UpstreamConfig;

use crate::error::ProxyError;

/// Provider endpoint selected by the `type` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Weather,
    Forecast,
}

impl Endpoint {
    /// `forecast` selects the forecast endpoint; anything else, or nothing, is current weather.
    pub fn from_type_param(value: Option<&str>) -> Self {
        match value {
            Some("forecast") => Self::Forecast,
            _ => Self::Weather,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Forecast => "forecast",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl UpstreamClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProxyError::Internal)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build from configuration, resolving the key from the environment first.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        Self::new(&config.base_url, config.resolved_api_key(), config.timeout())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch the provider's JSON for `city`, untouched.
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        city: &str,
    ) -> Result<serde_json::Value, ProxyError> {
        let api_key = self.api_key.as_deref().ok_or(ProxyError::MissingApiKey)?;
        let url = format!("{}/{}", self.base_url, endpoint.path());

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", api_key),
                ("units", "metric"),
                ("lang", "kr"),
            ])
            .send()
            .await
            .map_err(|e| ProxyError::Internal(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let details = response
                .json::<ProviderErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                details,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProxyError::Internal(e.without_url()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: Option<&str>) -> UpstreamClient {
        UpstreamClient::new(
            &server.uri(),
            key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_from_type_param() {
        assert_eq!(Endpoint::from_type_param(Some("forecast")), Endpoint::Forecast);
        assert_eq!(Endpoint::from_type_param(Some("current")), Endpoint::Weather);
        assert_eq!(Endpoint::from_type_param(Some("hourly")), Endpoint::Weather);
        assert_eq!(Endpoint::from_type_param(None), Endpoint::Weather);
    }

    #[test]
    fn test_debug_redacts_key() {
        let client =
            UpstreamClient::new("http://localhost", Some("secret".into()), Duration::from_secs(1))
                .unwrap();
        let printed = format!("{:?}", client);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_fetch_sends_provider_params() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "New York"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "kr"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": [] })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let body = client(&mock_server, Some("test-key"))
            .fetch(Endpoint::Forecast, "New York")
            .await
            .unwrap();

        assert_eq!(body, serde_json::json!({ "list": [] }));
    }

    #[tokio::test]
    async fn test_missing_key_skips_provider() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, None)
            .fetch(Endpoint::Weather, "Seoul")
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_provider_error_message_becomes_details() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404",
                "message": "city not found"
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Some("k"))
            .fetch(Endpoint::Weather, "Atlantis")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProxyError::Upstream { status: 404, ref details } if details == "city not found"
        ));
    }

    #[tokio::test]
    async fn test_provider_error_without_body_uses_status_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Some("bad"))
            .fetch(Endpoint::Weather, "Seoul")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProxyError::Upstream { status: 401, ref details } if details == "Unauthorized"
        ));
    }
}
