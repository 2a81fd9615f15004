//! Settings persistence adapters.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use wrangler_core::{PathError, Settings, SettingsStore, StoreError, settings_file_path};

/// Settings stored as pretty-printed JSON in one file.
///
/// A missing file yields default settings.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `settings.json` under the data root.
    pub fn at_default_location() -> Result<Self, PathError> {
        Ok(Self::new(settings_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(e) => return Err(StoreError::Storage(e.to_string())),
        };

        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Option<Settings>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        let guard = self
            .settings
            .lock()
            .map_err(|_| StoreError::Storage("settings lock poisoned".to_string()))?;
        Ok(guard.clone().unwrap_or_default())
    }

    async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|_| StoreError::Storage("settings lock poisoned".to_string()))?;
        *guard = Some(settings.clone());
        Ok(())
    }
}
