//! Durable dashboard preferences.
//!
//! Values are plain strings under fixed keys, stored as one JSON object in
//! `preferences.json` next to the config file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use weatherdash_weather::TemperatureUnit;

pub const UNIT_KEY: &str = "weather-unit";
pub const AUTO_REFRESH_KEY: &str = "weather-auto-refresh";

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Preference file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Key-value storage for preferences
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Preferences kept in a JSON file
pub struct FilePreferences {
    path: PathBuf,
    // Serializes read-modify-write of the file
    write_lock: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, PreferenceError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&json)?)
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _guard = self.write_lock.lock();

        // A corrupt file is replaced rather than blocking every later write
        let mut values = self.read_all().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable preferences at {:?}: {}", self.path, e);
            HashMap::new()
        });
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;

        tracing::debug!("Stored preference {} = {}", key, value);
        Ok(())
    }
}

/// Preferences that live only as long as the process
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The typed preferences the dashboard reads at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub unit: TemperatureUnit,
    pub auto_refresh: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            unit: TemperatureUnit::Celsius,
            auto_refresh: true,
        }
    }
}

impl Preferences {
    /// Read both keys, falling back to defaults for missing or unusable values.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Self::default();

        let unit = match read(store, UNIT_KEY).as_deref() {
            None => defaults.unit,
            Some(raw) => TemperatureUnit::parse(raw).unwrap_or_else(|| {
                tracing::warn!("Unknown {} value {:?}, using {}", UNIT_KEY, raw, defaults.unit.as_str());
                defaults.unit
            }),
        };

        let auto_refresh = match read(store, AUTO_REFRESH_KEY).as_deref() {
            None => defaults.auto_refresh,
            Some("true") => true,
            Some("false") => false,
            Some(raw) => {
                tracing::warn!("Unknown {} value {:?}, using default", AUTO_REFRESH_KEY, raw);
                defaults.auto_refresh
            }
        };

        Self { unit, auto_refresh }
    }
}

fn read(store: &dyn PreferenceStore, key: &str) -> Option<String> {
    store.get(key).unwrap_or_else(|e| {
        tracing::warn!("Failed to read preference {}: {}", key, e);
        None
    })
}

/// Write one preference; failures are logged, never returned.
pub(crate) fn persist(store: &dyn PreferenceStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        tracing::warn!("Failed to persist preference {}: {}", key, e);
    }
}
