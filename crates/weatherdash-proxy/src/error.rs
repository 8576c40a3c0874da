//! Proxy error types and their JSON responses.

use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;
use warp::Reply;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("City parameter is required")]
    MissingCity,

    #[error("API key is not configured")]
    MissingApiKey,

    /// Non-2xx from the provider; `details` is its `message` or the status text
    #[error("Failed to fetch weather data")]
    Upstream { status: u16, details: String },

    /// Transport failure or an unreadable provider body
    #[error("Internal server error")]
    Internal(#[source] reqwest::Error),
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCity => StatusCode::BAD_REQUEST,
            Self::MissingApiKey | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            Self::Upstream { details, .. } => Some(details.clone()),
            _ => None,
        };
        ErrorBody {
            error: self.to_string(),
            details,
        }
    }

    pub fn into_response(self) -> warp::reply::Response {
        warp::reply::with_status(warp::reply::json(&self.body()), self.status()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_city_body() {
        let err = ProxyError::MissingCity;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "City parameter is required" }));
    }

    #[test]
    fn test_upstream_forwards_status_and_details() {
        let err = ProxyError::Upstream {
            status: 404,
            details: "city not found".into(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": "Failed to fetch weather data",
                "details": "city not found"
            })
        );
    }

    #[test]
    fn test_out_of_range_upstream_status() {
        let err = ProxyError::Upstream {
            status: 42,
            details: String::new(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
