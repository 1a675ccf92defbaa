//! Config command handlers.
//!
//! These touch only the settings file so a broken installation directory can
//! still be corrected from the command line.

use std::path::PathBuf;

use anyhow::Result;
use workdl_axum::bootstrap::settings_repository;
use workdl_core::{EngineError, SettingsRepository, SettingsUpdate, validate_settings};

use crate::commands::{ConfigCommand, SetArgs};
use crate::error::CliError;

pub async fn execute(config: Option<PathBuf>, command: ConfigCommand) -> Result<()> {
    let repo = settings_repository(config)?;
    match command {
        ConfigCommand::Show => {
            let settings = repo.load().await.map_err(EngineError::from)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigCommand::Set(args) => {
            let update = update_from_args(args)?;
            let mut settings = repo.load().await.map_err(EngineError::from)?;
            settings.merge(&update);
            validate_settings(&settings).map_err(EngineError::from)?;
            repo.save(&settings).await.map_err(EngineError::from)?;
            println!("Settings saved to {}", repo.path().display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigCommand::Path => println!("{}", repo.path().display()),
    }
    Ok(())
}

/// Turn `config set` flags into a partial update. At least one flag is required.
fn update_from_args(args: SetArgs) -> Result<SettingsUpdate, CliError> {
    let update = SettingsUpdate {
        install_dir: args.install_dir.map(Some),
        fetch_tool_path: args.fetch_tool.map(Some),
        game_executable: args.game_executable,
        launch_parameters: args.launch_parameters,
        continuous_download: args.continuous,
        clean_on_finish: args.clean_on_finish,
        skip_already_installed: args.skip_installed,
        fetch_timeout_secs: args.fetch_timeout,
        stop_grace_secs: args.stop_grace,
    };
    if update == SettingsUpdate::default() {
        return Err(CliError::Validation(
            "nothing to change; pass at least one setting flag".to_string(),
        ));
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_rejected() {
        assert!(matches!(
            update_from_args(SetArgs::default()),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn test_set_args_map_to_update() {
        let args = SetArgs {
            install_dir: Some(PathBuf::from("/games/bo3")),
            continuous: Some(false),
            fetch_timeout: Some(600),
            ..SetArgs::default()
        };
        let update = update_from_args(args).unwrap();
        assert_eq!(update.install_dir, Some(Some(PathBuf::from("/games/bo3"))));
        assert_eq!(update.continuous_download, Some(false));
        assert_eq!(update.fetch_timeout_secs, Some(600));
        assert_eq!(update.fetch_tool_path, None);
        assert_eq!(update.game_executable, None);
    }
}
