//! Integration tests for configuration management
//!
//! These tests verify that the configuration system works correctly
//! across module boundaries.

use r_radiocli::config::Settings;
use r_radiocli::ui::Args;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tempfile::tempdir;

#[cfg(test)]
mod config_integration_tests {
    use super::*;

    /// Test complete configuration workflow
    #[test]
    fn test_config_lifecycle() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");

        let mut settings = Settings::default();
        settings.api_base_url = "https://api.example.com/v1".to_string();
        settings.device_id = Some("living-room".to_string());
        settings.access_token = Some("integration-token".to_string());
        settings.tick_interval_ms = 500;
        settings.fade.duration_ms = 1000;
        settings.voice.rate = 1.0;

        settings.validate()?;
        settings.save(&config_path)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded, settings);
        assert_eq!(loaded.fade.steps(), 20);
        assert_eq!(loaded.radio_options().tick_interval, Duration::from_millis(500));

        let (device_id, session) = loaded.device_credentials()?;
        assert_eq!(device_id, "living-room");
        assert_eq!(session.access_token(), "integration-token");

        Ok(())
    }

    /// Command-line values win over the file
    #[test]
    fn test_cli_overrides_file() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");

        let mut settings = Settings::default();
        settings.device_id = Some("from-file".to_string());
        settings.save(&config_path)?;

        let args = Args::try_parse_from([
            "r-radiocli",
            "--plan",
            "plan.json",
            "--config",
            config_path.to_str().unwrap(),
            "--device-id",
            "from-cli",
        ])?;
        assert_eq!(args.config_path(), config_path);

        let mut loaded = Settings::load(&args.config_path())?;
        args.apply_to(&mut loaded);
        assert_eq!(loaded.device_id.as_deref(), Some("from-cli"));
        // Still no token, so a real device cannot be driven
        assert!(loaded.device_credentials().is_err());

        Ok(())
    }
}
