//! HTTP protocol types exchanged with the recording appliance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `GET /api/videos/old`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedListing {
    /// Archived file names, in the order the appliance lists them.
    #[serde(default)]
    pub videos: Vec<String>,
}

/// Error body returned by the appliance on non-success responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Usually a string; validation failures carry a structured value.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Human-readable form of `detail`, if any.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Operator settings owned by the appliance (`/api/settings`).
///
/// Keys the controller does not edit are kept in `extra` so that a
/// load → edit → save cycle sends them back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub obs_host: String,
    pub obs_port: u16,
    pub obs_password: String,
    /// Seconds between the trigger and the start of the recording.
    pub standby_delay: u64,
    /// Recording length in seconds.
    pub recording_duration: u64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            obs_host: "localhost".into(),
            obs_port: 4455,
            obs_password: String::new(),
            standby_delay: 3,
            recording_duration: 10,
            extra: BTreeMap::new(),
        }
    }
}
