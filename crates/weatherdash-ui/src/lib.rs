//! Dashboard state for weatherdash: preferences, the shared UI store with its
//! auto-refresh timer, and the controller that drives refresh cycles.

pub mod controller;
pub mod error_mapping;
pub mod preferences;
pub mod scheduler;
pub mod store;

pub use controller::DashboardController;
pub use preferences::{
    FilePreferences, MemoryPreferences, PreferenceError, PreferenceStore, Preferences,
    AUTO_REFRESH_KEY, UNIT_KEY,
};
pub use scheduler::Scheduler;
pub use store::{
    RefreshCallback, RefreshFuture, UiState, UiStateStore, DEFAULT_REFRESH_INTERVAL,
};
