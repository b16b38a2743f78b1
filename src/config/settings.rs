//! Application settings and configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::commentary::FadeSettings;
use crate::radio::RadioOptions;
use crate::session::Session;
use crate::speech::VoicePreferences;

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Base URL of the provider's Web API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Remote device that plays the segments
    #[serde(default)]
    pub device_id: Option<String>,
    /// Bearer token for the Web API
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token expiry as seconds since the Unix epoch
    #[serde(default)]
    pub access_token_expires_at: Option<u64>,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_play_timeout_secs")]
    pub play_timeout_secs: u64,
    /// How often the device state is polled
    #[serde(default = "default_state_poll_secs")]
    pub state_poll_secs: u64,
    #[serde(default)]
    pub fade: FadeSettings,
    #[serde(default)]
    pub voice: VoicePreferences,
    /// Reading speed of the console speech engine
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,
}

fn default_api_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_play_timeout_secs() -> u64 {
    10
}

fn default_state_poll_secs() -> u64 {
    5
}

fn default_words_per_minute() -> u32 {
    170
}

/// Error types for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_base_url: default_api_base_url(),
            device_id: None,
            access_token: None,
            access_token_expires_at: None,
            tick_interval_ms: default_tick_interval_ms(),
            play_timeout_secs: default_play_timeout_secs(),
            state_poll_secs: default_state_poll_secs(),
            fade: FadeSettings::default(),
            voice: VoicePreferences::default(),
            words_per_minute: default_words_per_minute(),
        }
    }
}

impl Settings {
    /// Load settings from a file, or defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("r-radiocli").join("config.json")
    }

    /// Validate timing and fade settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("API base URL cannot be empty".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError("tick_interval_ms must be greater than 0".to_string()));
        }
        if self.play_timeout_secs == 0 || self.state_poll_secs == 0 {
            return Err(ConfigError::ValidationError(
                "play_timeout_secs and state_poll_secs must be greater than 0".to_string(),
            ));
        }
        if self.fade.step_ms == 0 || self.fade.step_ms > self.fade.duration_ms {
            return Err(ConfigError::ValidationError(format!(
                "fade step ({}ms) must be non-zero and no longer than the fade ({}ms)",
                self.fade.step_ms, self.fade.duration_ms
            )));
        }
        if !(self.fade.target_volume > 0.0 && self.fade.target_volume <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "fade target volume {} must be in (0, 1]",
                self.fade.target_volume
            )));
        }
        Ok(())
    }

    /// Device id and session needed to drive a real device
    pub fn device_credentials(&self) -> Result<(String, Session), ConfigError> {
        let device_id = match self.device_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(ConfigError::ValidationError("A device id is required".to_string())),
        };
        let token = match self.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(ConfigError::ValidationError("An access token is required".to_string())),
        };

        let session = match self.access_token_expires_at {
            Some(secs) => Session::new(token).with_expiry(UNIX_EPOCH + Duration::from_secs(secs)),
            None => Session::new(token),
        };
        if session.is_expired_at(SystemTime::now()) {
            return Err(ConfigError::ValidationError("The access token has expired".to_string()));
        }
        Ok((device_id, session))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn state_poll_interval(&self) -> Duration {
        Duration::from_secs(self.state_poll_secs)
    }

    pub fn radio_options(&self) -> RadioOptions {
        RadioOptions {
            tick_interval: self.tick_interval(),
            play_timeout: Duration::from_secs(self.play_timeout_secs),
            ..RadioOptions::default()
        }
    }
}
