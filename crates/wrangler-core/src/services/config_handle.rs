//! Shared configuration handle.
//!
//! Components read an immutable [`Settings`] snapshot at the start of each
//! operation. Writes go through the handle, are validated, persisted through
//! the [`SettingsStore`] and only then become visible to readers.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::ToolRole;
use crate::error::{ConfigurationError, OrchestratorError};
use crate::ports::SettingsStore;
use crate::settings::{Settings, SettingsUpdate, validate_settings};

#[derive(Clone)]
pub struct ConfigHandle {
    store: Arc<dyn SettingsStore>,
    current: Arc<RwLock<Settings>>,
}

impl ConfigHandle {
    /// Load settings from `store` and wrap them in a handle.
    pub async fn load(store: Arc<dyn SettingsStore>) -> Result<Self, OrchestratorError> {
        let settings = store.load().await?;
        validate_settings(&settings)?;
        Ok(Self::with_settings(store, settings))
    }

    /// Build a handle around already-loaded settings.
    pub fn with_settings(store: Arc<dyn SettingsStore>, settings: Settings) -> Self {
        Self {
            store,
            current: Arc::new(RwLock::new(settings)),
        }
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a partial update, validate, persist, then publish.
    pub async fn update(&self, update: &SettingsUpdate) -> Result<Settings, OrchestratorError> {
        let mut next = self.snapshot();
        next.merge(update);
        validate_settings(&next)?;
        self.store.save(&next).await?;
        self.replace(next.clone());
        Ok(next)
    }

    /// Point the primary toolchain root at `path`.
    ///
    /// The directory must already contain a built server binary.
    pub async fn update_toolchain_root(&self, path: &Path) -> Result<Settings, OrchestratorError> {
        let has_server = ToolRole::Server
            .candidate_subpaths()
            .iter()
            .any(|sub| path.join(sub).is_file());
        if !has_server {
            return Err(ConfigurationError::ToolchainInvalid {
                path: path.to_path_buf(),
            }
            .into());
        }

        self.update(&SettingsUpdate {
            toolchain_root: Some(path.to_path_buf()),
            ..Default::default()
        })
        .await
    }

    fn replace(&self, settings: Settings) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("current", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ports::StoreError;
    use crate::ports::settings_store::MockSettingsStore;

    struct MockSettingsRepo {
        settings: Mutex<Settings>,
    }

    impl MockSettingsRepo {
        fn new() -> Self {
            Self {
                settings: Mutex::new(Settings::default()),
            }
        }
    }

    #[async_trait]
    impl SettingsStore for MockSettingsRepo {
        async fn load(&self) -> Result<Settings, StoreError> {
            Ok(self.settings.lock().unwrap().clone())
        }

        async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
            *self.settings.lock().unwrap() = settings.clone();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_update_is_persisted_and_published() {
        let repo = Arc::new(MockSettingsRepo::new());
        let handle = ConfigHandle::load(repo.clone()).await.unwrap();

        let update = SettingsUpdate {
            server_port: Some(9191),
            ..Default::default()
        };
        handle.update(&update).await.unwrap();

        assert_eq!(handle.snapshot().server_port, 9191);
        assert_eq!(repo.settings.lock().unwrap().server_port, 9191);
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected() {
        let repo = Arc::new(MockSettingsRepo::new());
        let handle = ConfigHandle::load(repo).await.unwrap();

        let update = SettingsUpdate {
            server_port: Some(80),
            ..Default::default()
        };
        let err = handle.update(&update).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(handle.snapshot().server_port, crate::DEFAULT_SERVER_PORT);
    }

    #[tokio::test]
    async fn test_toolchain_root_requires_server_binary() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MockSettingsStore::new();
        store.expect_save().times(1).returning(|_| Ok(()));
        let handle = ConfigHandle::with_settings(Arc::new(store), Settings::default());

        let err = handle.update_toolchain_root(dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Configuration(ConfigurationError::ToolchainInvalid { .. })
        ));

        let bin = dir.path().join("build").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(format!("llama-server{}", std::env::consts::EXE_SUFFIX)), b"")
            .unwrap();

        let updated = handle.update_toolchain_root(dir.path()).await.unwrap();
        assert_eq!(updated.toolchain_root, dir.path());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_snapshot() {
        let mut store = MockSettingsStore::new();
        store
            .expect_save()
            .returning(|_| Err(StoreError::Storage("disk full".to_string())));
        let handle = ConfigHandle::with_settings(Arc::new(store), Settings::default());

        let update = SettingsUpdate {
            context_size: Some(4096),
            ..Default::default()
        };
        assert!(handle.update(&update).await.is_err());
        assert_eq!(handle.snapshot().context_size, crate::DEFAULT_CONTEXT_SIZE);
    }
}
