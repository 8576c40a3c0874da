//! Page-level refresh cycle for the dashboard.
//!
//! Fetches current conditions and the forecast for one city, concurrently,
//! and records the outcome in the shared [`UiStateStore`].

use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::Mutex;
use weatherdash_weather::{ForecastSeries, WeatherClient, WeatherSnapshot};

use crate::error_mapping;
use crate::store::{RefreshCallback, RefreshFuture, UiStateStore};

#[derive(Debug, Default)]
struct DashboardData {
    /// City of the last successful load
    city: String,
    /// City of the last attempted load
    requested: String,
    current: Option<WeatherSnapshot>,
    forecast: Option<ForecastSeries>,
}

pub struct DashboardController {
    client: WeatherClient,
    store: Arc<UiStateStore>,
    data: Mutex<DashboardData>,
}

impl DashboardController {
    pub fn new(client: WeatherClient, store: Arc<UiStateStore>, default_city: &str) -> Arc<Self> {
        Arc::new(Self {
            client,
            store,
            data: Mutex::new(DashboardData {
                city: default_city.trim().to_string(),
                requested: default_city.trim().to_string(),
                ..Default::default()
            }),
        })
    }

    /// Install this controller as the store's refresh callback.
    ///
    /// The store only holds a weak reference; once the controller is dropped
    /// the callback does nothing.
    pub fn register(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let callback: RefreshCallback = Arc::new(move || -> RefreshFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(controller) = weak.upgrade() {
                    controller.manual_refresh().await;
                }
            })
        });
        self.store.set_refresh_callback(callback);
    }

    /// Load `city`, using cached data when it is still fresh.
    ///
    /// Blank input is ignored. Returns whether both fetches succeeded.
    pub async fn refresh(&self, city: &str) -> bool {
        self.load(city, true).await
    }

    /// Reload the current city from the network, bypassing the cache.
    pub async fn manual_refresh(&self) -> bool {
        let city = self.city();
        self.load(&city, false).await
    }

    /// Re-run the last attempted load, e.g. after a failure.
    pub async fn retry(&self) -> bool {
        let city = self.data.lock().requested.clone();
        self.load(&city, true).await
    }

    pub fn city(&self) -> String {
        self.data.lock().city.clone()
    }

    pub fn current(&self) -> Option<WeatherSnapshot> {
        self.data.lock().current.clone()
    }

    pub fn forecast(&self) -> Option<ForecastSeries> {
        self.data.lock().forecast.clone()
    }

    pub fn store(&self) -> &Arc<UiStateStore> {
        &self.store
    }

    async fn load(&self, city: &str, use_cache: bool) -> bool {
        let city = city.trim();
        if city.is_empty() {
            return false;
        }

        self.data.lock().requested = city.to_string();
        self.store.set_is_loading(true);
        self.store.set_error(None);

        // Both run to completion so a successful half still lands in the cache
        let (current, forecast) = tokio::join!(
            self.client.fetch_current(city, use_cache),
            self.client.fetch_forecast(city, use_cache)
        );

        let ok = match current.and_then(|current| forecast.map(|forecast| (current, forecast))) {
            Ok((current, forecast)) => {
                {
                    let mut data = self.data.lock();
                    data.current = Some(current);
                    data.forecast = Some(forecast);
                    data.city = city.to_string();
                }
                self.store.set_last_updated(Some(Utc::now()));
                self.store.set_retry_count(0);
                tracing::info!("Dashboard refreshed for {}", city);
                true
            }
            Err(failure) => {
                tracing::warn!("Dashboard refresh for {} failed: {}", city, failure);
                let retries = self.store.snapshot().retry_count;
                self.store.set_error(Some(error_mapping::user_message(failure)));
                self.store.set_retry_count(retries.saturating_add(1));
                false
            }
        };

        self.store.set_is_loading(false);
        ok
    }
}
