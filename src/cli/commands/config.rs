//! Config command implementation.

use crate::cli::{mask_secret, ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: Option<&str>) -> Result<()> {
    let path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            println!("{}", render(&settings)?);
        }

        ConfigAction::Init { force } => {
            if path.exists() && !force {
                Output::warning(&format!("Config already exists at {}", path.display()));
                Output::info("Use --force to overwrite it.");
                return Ok(());
            }
            write_defaults(&path)?;
            Output::success(&format!("Created default config at {}", path.display()));
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// Settings as TOML with the API key masked.
fn render(settings: &Settings) -> Result<String> {
    let mut shown = settings.clone();
    shown.model.api_key = shown.model.api_key.as_deref().map(mask_secret);
    toml::to_string_pretty(&shown).map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))
}

/// Write defaults without picking up secrets from the environment.
fn write_defaults(path: &PathBuf) -> Result<()> {
    Settings::default().save_to(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_masks_key() {
        let mut settings = Settings::default();
        settings.model.api_key = Some("AIzaSySecretValue9876".to_string());

        let shown = render(&settings).unwrap();
        assert!(shown.contains("9876"));
        assert!(!shown.contains("SecretValue"));
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        run_config(&ConfigAction::Init { force: false }, Settings::default(), path.to_str()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = toml::from_str(&content).unwrap();
        assert_eq!(loaded.model.name, Settings::default().model.name);
        assert!(loaded.model.api_key.is_none());
    }
}
