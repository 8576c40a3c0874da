//! Shared dashboard state with change notification.
//!
//! Every view reads the same [`UiState`] through [`UiStateStore::snapshot`] or
//! a `watch` subscription. The store owns the auto-refresh [`Scheduler`] and
//! the slot the dashboard controller registers its refresh callback in.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use weatherdash_weather::TemperatureUnit;

use crate::preferences::{self, PreferenceStore, Preferences, AUTO_REFRESH_KEY, UNIT_KEY};
use crate::scheduler::Scheduler;

/// Default auto-refresh period
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

pub type RefreshFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type RefreshCallback = Arc<dyn Fn() -> RefreshFuture + Send + Sync>;

type CallbackSlot = Arc<Mutex<Option<RefreshCallback>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub unit: TemperatureUnit,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub auto_refresh: bool,
    pub retry_count: u32,
}

impl UiState {
    fn from_preferences(prefs: Preferences) -> Self {
        Self {
            unit: prefs.unit,
            is_loading: false,
            error: None,
            last_updated: None,
            auto_refresh: prefs.auto_refresh,
            retry_count: 0,
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::from_preferences(Preferences::default())
    }
}

pub struct UiStateStore {
    state: watch::Sender<UiState>,
    preferences: Arc<dyn PreferenceStore>,
    callback: CallbackSlot,
    scheduler: Mutex<Option<Scheduler>>,
    refresh_interval: Duration,
    shutdown: CancellationToken,
}

impl UiStateStore {
    /// Build the store from persisted preferences.
    ///
    /// When auto-refresh is enabled the scheduler starts immediately, so this
    /// must run inside a tokio runtime. `shutdown` stops the scheduler.
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        refresh_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let initial = UiState::from_preferences(Preferences::load(preferences.as_ref()));
        let auto_refresh = initial.auto_refresh;
        let (state, _) = watch::channel(initial);

        let store = Self {
            state,
            preferences,
            callback: Arc::new(Mutex::new(None)),
            scheduler: Mutex::new(None),
            refresh_interval,
            shutdown,
        };
        if auto_refresh {
            store.start_scheduler();
        }
        store
    }

    pub fn snapshot(&self) -> UiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn toggle_unit(&self) -> TemperatureUnit {
        let mut unit = TemperatureUnit::default();
        self.state.send_modify(|state| {
            state.unit = state.unit.toggled();
            unit = state.unit;
        });
        preferences::persist(self.preferences.as_ref(), UNIT_KEY, unit.as_str());
        tracing::info!("Temperature unit set to {}", unit.as_str());
        unit
    }

    /// Flip auto-refresh. The scheduler is started or cancelled before this returns.
    pub fn toggle_auto_refresh(&self) -> bool {
        let mut enabled = false;
        self.state.send_modify(|state| {
            state.auto_refresh = !state.auto_refresh;
            enabled = state.auto_refresh;
        });
        preferences::persist(
            self.preferences.as_ref(),
            AUTO_REFRESH_KEY,
            if enabled { "true" } else { "false" },
        );

        if enabled {
            self.start_scheduler();
        } else {
            self.stop_scheduler();
        }
        tracing::info!("Auto-refresh {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    pub fn set_refresh_callback(&self, callback: RefreshCallback) {
        *self.callback.lock() = Some(callback);
    }

    pub fn clear_refresh_callback(&self) {
        self.callback.lock().take();
    }

    /// Run the registered refresh callback, if any.
    pub async fn refresh_weather(&self) {
        run_callback(&self.callback).await;
    }

    pub fn set_is_loading(&self, loading: bool) {
        self.state.send_modify(|state| state.is_loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|state| state.error = error);
    }

    pub fn set_last_updated(&self, at: Option<DateTime<Utc>>) {
        self.state.send_modify(|state| state.last_updated = at);
    }

    pub fn set_retry_count(&self, count: u32) {
        self.state.send_modify(|state| state.retry_count = count);
    }

    pub fn is_auto_refresh_scheduled(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .is_some_and(Scheduler::is_running)
    }

    /// Stop the auto-refresh timer for good
    pub fn shutdown(&self) {
        self.stop_scheduler();
        self.clear_refresh_callback();
    }

    fn start_scheduler(&self) {
        if self.shutdown.is_cancelled() {
            tracing::debug!("Not starting auto-refresh during shutdown");
            return;
        }

        let slot = self.callback.clone();
        let scheduler = Scheduler::start(self.refresh_interval, &self.shutdown, move || {
            let slot = slot.clone();
            async move {
                tracing::info!("Auto-refresh triggered");
                run_callback(&slot).await;
            }
        });

        // Replacing a previous scheduler drops and cancels it
        *self.scheduler.lock() = Some(scheduler);
    }

    fn stop_scheduler(&self) {
        if let Some(scheduler) = self.scheduler.lock().take() {
            scheduler.cancel();
        }
    }
}

impl Drop for UiStateStore {
    fn drop(&mut self) {
        self.stop_scheduler();
    }
}

async fn run_callback(slot: &CallbackSlot) {
    // Clone out so the lock is not held across the await
    let callback = slot.lock().clone();
    if let Some(callback) = callback {
        callback().await;
    }
}
