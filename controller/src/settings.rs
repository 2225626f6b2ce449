//! Settings controller for the admin view: load, edit, and save the
//! appliance settings, plus the two admin actions that poke the recorder
//! directly (connection test and manual recording).

use std::time::Duration;

use tracing::{info, warn};

use booth_common::protocol::Settings;

use crate::api::{ApiError, BoothApi};

/// How long after a manual recording the admin view should refresh its
/// status (standby + recording + margin for the file move).
pub const MANUAL_REFRESH_DELAY: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{key} must be a whole number, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("expected KEY=VALUE, got {0:?}")]
    MalformedEdit(String),
}

/// Editable copy of the settings while the form is open.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    settings: Settings,
}

impl SettingsForm {
    pub fn new(settings: Settings) -> Self {
        SettingsForm { settings }
    }

    /// Set one field from its text form.  Numeric fields must parse as
    /// integers; keys the form does not know are passed through as text.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        match key {
            "obs_host" => self.settings.obs_host = value.to_string(),
            "obs_password" => self.settings.obs_password = value.to_string(),
            "obs_port" => self.settings.obs_port = parse_number(key, value)?,
            "standby_delay" => self.settings.standby_delay = parse_number(key, value)?,
            "recording_duration" => self.settings.recording_duration = parse_number(key, value)?,
            other => {
                self.settings
                    .extra
                    .insert(other.to_string(), serde_json::Value::String(value.to_string()));
            }
        }
        Ok(())
    }

    /// Apply a `KEY=VALUE` edit.
    pub fn apply_pair(&mut self, pair: &str) -> Result<(), SettingsError> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| SettingsError::MalformedEdit(pair.to_string()))?;
        self.apply(key.trim(), value)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value.parse().map_err(|_| SettingsError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Outcome of the "test connection" admin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCheck {
    Connected,
    Unreachable(String),
}

pub struct SettingsController<A> {
    api: A,
}

impl<A: BoothApi> SettingsController<A> {
    pub fn new(api: A) -> Self {
        SettingsController { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn load(&self) -> Result<Settings, ApiError> {
        let settings = self.api.get_settings().await?;
        info!("Loaded settings (obs={}:{})", settings.obs_host, settings.obs_port);
        Ok(settings)
    }

    /// Open an editable copy of the current settings.
    pub async fn edit(&self) -> Result<SettingsForm, ApiError> {
        self.load().await.map(SettingsForm::new)
    }

    /// Save settings; returns the appliance's confirmation message.
    pub async fn save(&self, settings: &Settings) -> Result<String, ApiError> {
        match self.api.save_settings(settings).await {
            Ok(message) => {
                info!("Settings saved");
                Ok(message.unwrap_or_else(|| "Settings saved successfully!".to_string()))
            }
            Err(e) => {
                warn!("Saving settings failed: {e}");
                Err(e)
            }
        }
    }

    /// Check that the appliance can reach OBS by asking it to record.
    pub async fn test_connection(&self) -> ConnectionCheck {
        match self.api.start_recording().await {
            Ok(()) => ConnectionCheck::Connected,
            Err(e) => {
                warn!("Connection test failed: {e}");
                ConnectionCheck::Unreachable(e.to_string())
            }
        }
    }

    /// Start a recording from the admin view.  On acceptance returns the
    /// delay after which the status overview is worth refreshing.
    pub async fn manual_recording(&self) -> Result<Duration, ApiError> {
        self.api.start_recording().await?;
        info!("Manual recording started");
        Ok(MANUAL_REFRESH_DELAY)
    }
}
