//! The `GET /api/weather` route.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use warp::{Filter, Reply};

use crate::error::ProxyError;
use crate::upstream::{Endpoint, UpstreamClient};

/// `GET /api/weather?city=<name>&type=current|forecast`
pub fn weather_route(
    upstream: Arc<UpstreamClient>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = warp::Rejection> + Clone {
    warp::get()
        .and(warp::path!("api" / "weather"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::any().map(move || upstream.clone()))
        .and_then(|params: HashMap<String, String>, upstream: Arc<UpstreamClient>| async move {
            Ok::<_, Infallible>(handle(params, &upstream).await)
        })
}

async fn handle(params: HashMap<String, String>, upstream: &UpstreamClient) -> warp::reply::Response {
    let Some(city) = params
        .get("city")
        .map(|city| city.trim())
        .filter(|city| !city.is_empty())
    else {
        return ProxyError::MissingCity.into_response();
    };
    let endpoint = Endpoint::from_type_param(params.get("type").map(String::as_str));

    tracing::info!(city, endpoint = endpoint.path(), "Proxying weather request");

    match upstream.fetch(endpoint, city).await {
        Ok(body) => warp::reply::json(&body).into_response(),
        Err(e) => {
            match &e {
                ProxyError::Internal(source) => {
                    tracing::error!("Weather API error: {}", source)
                }
                other => tracing::warn!(status = %other.status(), "Weather request failed: {}", other),
            }
            e.into_response()
        }
    }
}
