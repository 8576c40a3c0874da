//! Fetch client -> proxy server -> mock provider.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use weatherdash_proxy::UpstreamClient;
use weatherdash_weather::{FetchError, RetryPolicy, WeatherCache, WeatherClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start_proxy(
    provider: &MockServer,
    api_key: Option<&str>,
) -> (WeatherClient, CancellationToken, tokio::task::JoinHandle<()>) {
    let upstream = UpstreamClient::new(
        &provider.uri(),
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap();
    let shutdown = CancellationToken::new();
    let (addr, handle) = weatherdash_proxy::spawn(
        "127.0.0.1:0".parse().unwrap(),
        upstream,
        shutdown.clone(),
    )
    .unwrap();

    let client = WeatherClient::new(&format!("http://{}", addr), Arc::new(WeatherCache::new()))
        .unwrap()
        .with_retry_policy(RetryPolicy::new(1, 1));

    (client, shutdown, handle)
}

#[tokio::test]
async fn test_current_weather_through_proxy() {
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Seoul"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": { "temp": 18.4, "feels_like": 17.9, "humidity": 55, "pressure": 1016 },
            "weather": [{ "main": "Clear", "description": "맑음", "icon": "01d" }],
            "wind": { "speed": 1.5 },
            "name": "Seoul",
            "sys": { "country": "KR" }
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let (client, shutdown, handle) = start_proxy(&provider, Some("k")).await;

    let snapshot = client.fetch_current("Seoul", true).await.unwrap();
    assert_eq!(snapshot.name, "Seoul");
    assert_eq!(snapshot.main.temp, 18.4);

    // Second call is served from the client cache
    client.fetch_current("Seoul", true).await.unwrap();

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_provider_error_reaches_client_message() {
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&provider)
        .await;

    let (client, shutdown, handle) = start_proxy(&provider, Some("k")).await;

    let err = client.fetch_forecast("Atlantis", true).await.unwrap_err();

    assert_eq!(err.attempts(), 2);
    assert!(matches!(
        err.last_error(),
        FetchError::Upstream { status: 404, message } if message == "Failed to fetch weather data"
    ));

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_missing_key_reaches_client_message() {
    let provider = MockServer::start().await;
    let (client, shutdown, handle) = start_proxy(&provider, None).await;

    let err = client.fetch_current("Seoul", false).await.unwrap_err();

    assert_eq!(err.last_error().to_string(), "API key is not configured");
    assert_eq!(err.last_error().status(), Some(500));

    shutdown.cancel();
    handle.await.unwrap();
}
