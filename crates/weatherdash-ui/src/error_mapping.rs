//! Maps fetch failures to weatherdash_core::AppError and dashboard text.

use weatherdash_core::{AppError, NetworkError, ReqwestErrorExt, WeatherError};
use weatherdash_weather::{FetchError, FetchFailure};

pub fn to_app_error(err: FetchError) -> AppError {
    match err {
        FetchError::InvalidCity => {
            AppError::Weather(WeatherError::InvalidRequest("empty city name".into()))
        }
        FetchError::Network(e) => AppError::Network(e.into_network_error()),
        FetchError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
        FetchError::Upstream { message, .. } => AppError::Weather(WeatherError::ApiError(message)),
    }
}

/// Text shown on the dashboard for a failed fetch.
///
/// Proxy responses already carry a readable message and are shown as-is;
/// transport and parse failures get the generic wording from [`AppError`].
pub fn user_message(failure: FetchFailure) -> String {
    match to_app_error(failure.into_inner()) {
        AppError::Weather(WeatherError::ApiError(message)) if !message.is_empty() => message,
        other => other.user_message().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(status: u16, message: &str) -> FetchError {
        FetchError::Upstream {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_upstream_maps_to_api_error() {
        assert!(matches!(
            to_app_error(upstream(404, "city not found")),
            AppError::Weather(WeatherError::ApiError(m)) if m == "city not found"
        ));
        assert!(matches!(
            to_app_error(upstream(503, "down")),
            AppError::Weather(WeatherError::ApiError(_))
        ));
    }

    #[test]
    fn test_user_message_keeps_proxy_text() {
        let failure = FetchFailure::new(4, upstream(404, "Failed to fetch weather data"));
        assert_eq!(user_message(failure), "Failed to fetch weather data");
    }

    #[test]
    fn test_user_message_for_blank_proxy_text() {
        let failure = FetchFailure::new(4, upstream(502, ""));
        assert_eq!(user_message(failure), "Weather service error. Please try again.");
    }

    #[test]
    fn test_user_message_hides_parse_details() {
        let failure = FetchFailure::new(4, FetchError::Parse("expected value at line 1".into()));
        assert_eq!(
            user_message(failure),
            "Received an unexpected response. Please try again."
        );
    }

    #[test]
    fn test_user_message_for_empty_city() {
        let failure = FetchFailure::new(0, FetchError::InvalidCity);
        assert_eq!(user_message(failure), "Enter a city name to search.");
    }
}
