//! JSON file implementation of [`SettingsRepository`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::ports::SettingsRepository;
use crate::settings::{Settings, SettingsError, validate_settings};

/// Settings stored as a pretty-printed JSON document.
///
/// A missing file loads as defaults. Saves go through a temporary sibling
/// file and a rename, so readers never see a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsRepository {
    path: PathBuf,
}

impl JsonFileSettingsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsRepository for JsonFileSettingsRepository {
    async fn load(&self) -> Result<Settings, SettingsError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(e) => {
                return Err(SettingsError::Storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let settings: Settings = serde_json::from_str(&raw).map_err(|e| {
            SettingsError::Storage(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        validate_settings(settings)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SettingsError::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }

        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| SettingsError::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SettingsError::Storage(format!("failed to replace {}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileSettingsRepository::new(dir.path().join("settings.json"));
        assert_eq!(repo.load().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileSettingsRepository::new(dir.path().join("nested").join("settings.json"));

        let settings = Settings {
            install_dir: Some(dir.path().join("game")),
            skip_already_installed: false,
            ..Default::default()
        };
        repo.save(&settings).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), settings);
        assert!(!repo.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"game_executable": "BlackOps3_UWP"}"#).unwrap();

        let loaded = JsonFileSettingsRepository::new(&path).load().await.unwrap();
        assert_eq!(loaded.game_executable, "BlackOps3_UWP");
        assert!(loaded.clean_on_finish);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileSettingsRepository::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SettingsError::Storage(_)));
    }

    #[tokio::test]
    async fn test_save_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileSettingsRepository::new(dir.path().join("settings.json"));
        let settings = Settings {
            game_executable: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            repo.save(&settings).await,
            Err(SettingsError::Invalid(_))
        ));
    }
}
