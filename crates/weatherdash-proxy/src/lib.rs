//! Server-side proxy between the dashboard and OpenWeatherMap.
//!
//! Exposes `GET /api/weather` and keeps the provider API key on the server.

pub mod error;
pub mod route;
pub mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use weatherdash_core::Config;

pub use error::{ErrorBody, ProxyError};
pub use route::weather_route;
pub use upstream::{Endpoint, UpstreamClient};

/// Bind `addr` and serve the weather route until `shutdown` is cancelled.
///
/// Returns the bound address (useful with port 0) and the server task.
pub fn spawn(
    addr: SocketAddr,
    upstream: UpstreamClient,
    shutdown: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    if !upstream.has_api_key() {
        tracing::warn!("No weather API key configured; requests will fail with 500");
    }

    let routes = weather_route(Arc::new(upstream));
    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async move { shutdown.cancelled().await })
        .with_context(|| format!("Failed to bind weather proxy on {}", addr))?;

    tracing::info!("Weather proxy listening on http://{}", bound);

    let handle = tokio::spawn(async move {
        server.await;
        tracing::info!("Weather proxy stopped");
    });

    Ok((bound, handle))
}

/// [`spawn`] with the bind address and upstream taken from `config`.
pub fn spawn_from_config(
    config: &Config,
    shutdown: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let addr: SocketAddr = config
        .proxy
        .bind
        .parse()
        .with_context(|| format!("Invalid proxy bind address: {}", config.proxy.bind))?;
    let upstream =
        UpstreamClient::from_config(&config.upstream).context("Failed to build upstream client")?;

    spawn(addr, upstream, shutdown)
}
