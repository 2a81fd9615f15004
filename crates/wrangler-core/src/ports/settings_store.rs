//! Settings persistence port.

use async_trait::async_trait;
use thiserror::Error;

use crate::settings::Settings;

/// Errors from a settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Settings storage error: {0}")]
    Storage(String),

    #[error("Settings file is corrupt: {0}")]
    Corrupt(String),
}

/// Repository for the settings document as a whole.
///
/// `load` returns default settings if nothing is stored yet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Settings, StoreError>;

    async fn save(&self, settings: &Settings) -> Result<(), StoreError>;
}
