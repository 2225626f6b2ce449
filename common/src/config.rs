//! Configuration parsing – reads a KEY=VALUE file (`booth.conf`).
//!
//! Only client-side knobs live here.  Operator settings such as the OBS
//! host or the standby delay are owned by the appliance and travel over
//! `/api/settings` instead (see [`crate::protocol::Settings`]).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // ── network (controller → appliance) ─────────────────────────────
    /// Base URL of the appliance, without a trailing slash.
    pub appliance_url: String,
    /// Upper bound for every HTTP call.
    pub request_timeout_secs: u64,

    // ── simulated recording timeline (tablet) ────────────────────────
    pub standby_ms: u64,
    pub recording_ms: u64,
    pub processing_ms: u64,
    pub completed_display_ms: u64,
    /// Pass through `Recording` instead of jumping from standby straight
    /// to processing.
    pub simulate_recording_phase: bool,
    /// Take standby/recording offsets from the appliance settings.
    pub timeline_from_settings: bool,

    // ── discovery (download page) ────────────────────────────────────
    pub poll_interval_secs: u64,
}

/// Durations that drive the open-loop recording timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineConfig {
    pub standby: Duration,
    pub recording: Duration,
    pub processing: Duration,
    pub completed_display: Duration,
    pub simulate_recording_phase: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            standby: Duration::from_millis(3000),
            recording: Duration::from_millis(10_000),
            processing: Duration::from_millis(2000),
            completed_display: Duration::from_millis(3000),
            simulate_recording_phase: false,
        }
    }
}

impl TimelineConfig {
    /// Replace the standby and recording durations with values reported
    /// by the appliance (whole seconds).
    pub fn with_appliance_durations(mut self, standby_secs: u64, recording_secs: u64) -> Self {
        self.standby = Duration::from_secs(standby_secs);
        self.recording = Duration::from_secs(recording_secs);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        from_map(&HashMap::new())
    }
}

impl Config {
    /// Default config path.
    pub fn default_path() -> &'static str {
        "/etc/booth/booth.conf"
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeline(&self) -> TimelineConfig {
        TimelineConfig {
            standby: Duration::from_millis(self.standby_ms),
            recording: Duration::from_millis(self.recording_ms),
            processing: Duration::from_millis(self.processing_ms),
            completed_display: Duration::from_millis(self.completed_display_ms),
            simulate_recording_phase: self.simulate_recording_phase,
        }
    }
}

/// Parse a `KEY=VALUE` configuration file.
///
/// Lines starting with `#` are comments.  Values may be optionally
/// double-quoted.  Unknown keys are silently ignored.
pub fn load(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))?;

    let map = parse_conf(&text);
    info!("Loaded config from {}", path.display());
    Ok(from_map(&map))
}

fn from_map(map: &HashMap<String, String>) -> Config {
    let get = |key: &str| -> Option<String> { map.get(key).cloned() };
    let get_u64 = |key: &str, default: u64| -> u64 {
        get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let get_bool = |key: &str| -> bool {
        get(key)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };

    Config {
        appliance_url: get("APPLIANCE_URL")
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "http://localhost:8000".into()),
        request_timeout_secs: get_u64("REQUEST_TIMEOUT_SECS", 10),

        standby_ms: get_u64("STANDBY_MS", 3000),
        recording_ms: get_u64("RECORDING_MS", 10_000),
        processing_ms: get_u64("PROCESSING_MS", 2000),
        completed_display_ms: get_u64("COMPLETED_DISPLAY_MS", 3000),
        simulate_recording_phase: get_bool("SIMULATE_RECORDING_PHASE"),
        timeline_from_settings: get_bool("TIMELINE_FROM_SETTINGS"),

        poll_interval_secs: get_u64("POLL_INTERVAL_SECS", 30),
    }
}

/// Parse `KEY=VALUE` lines into a map, stripping optional double-quotes.
fn parse_conf(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim();
            let val = val.trim().trim_matches('"');
            map.insert(key.to_string(), val.to_string());
        }
    }
    map
}

// ─── tests ───────────────────────────────────────────────────────────────
