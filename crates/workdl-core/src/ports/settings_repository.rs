//! Settings repository trait definition.
//!
//! Persistence of settings is an external concern; the engine loads the
//! current values through this port at the start of each operation.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::settings::{Settings, SettingsError};

/// Repository for engine settings.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load settings. Returns defaults if none are stored.
    async fn load(&self) -> Result<Settings, SettingsError>;

    /// Persist settings.
    async fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct InMemorySettingsRepository {
    inner: RwLock<Settings>,
}

impl InMemorySettingsRepository {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.inner.write().await = settings.clone();
        Ok(())
    }
}
