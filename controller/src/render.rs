//! Terminal rendering of controller state.
//!
//! The controllers publish plain values; this module is the only place
//! that knows how they look on screen.

use std::fmt::Write;

use tokio::sync::watch;

use booth_common::protocol::Settings;

use crate::discovery::DiscoveryState;
use crate::lifecycle::StatusSignal;
use crate::status::SystemStatus;

pub fn status_line(signal: &StatusSignal) -> String {
    let hint = if signal.trigger_enabled {
        "  [Enter] record"
    } else {
        ""
    };
    format!("[{:<10}] {}{hint}", signal.phase.as_str(), signal.message)
}

pub fn discovery_view(state: &DiscoveryState) -> String {
    let mut out = String::new();
    match &state.latest {
        Some(video) => {
            let _ = writeln!(out, "Video available: {}", video.name);
            let _ = writeln!(out, "  Date: {}", video.date_label());
            let _ = writeln!(out, "  Size: {}", video.size_label());
            let _ = writeln!(out, "  Download: {}", video.locator);
        }
        None => {
            let _ = writeln!(out, "No video available yet.");
        }
    }

    if state.archived.is_empty() {
        let _ = writeln!(out, "No archived videos.");
    } else {
        let _ = writeln!(out, "Archived videos:");
        for video in &state.archived {
            let _ = writeln!(out, "  {}  {}", video.name, video.locator);
        }
    }
    out
}

pub fn system_status(status: &SystemStatus) -> String {
    let archived = status
        .archived_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".into());
    format!(
        "Last recording: {}\nLatest files:   {}\nArchived files: {}\n",
        status.last_recording_label(),
        status.latest_count(),
        archived
    )
}

/// Settings as `key = value` lines; the password is masked.
pub fn settings(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "obs_host = {}", settings.obs_host);
    let _ = writeln!(out, "obs_port = {}", settings.obs_port);
    let masked = "*".repeat(settings.obs_password.chars().count());
    let _ = writeln!(out, "obs_password = {masked}");
    let _ = writeln!(out, "standby_delay = {}", settings.standby_delay);
    let _ = writeln!(out, "recording_duration = {}", settings.recording_duration);
    for (key, value) in &settings.extra {
        match value {
            serde_json::Value::String(s) => {
                let _ = writeln!(out, "{key} = {s}");
            }
            other => {
                let _ = writeln!(out, "{key} = {other}");
            }
        }
    }
    out
}

/// Print every status change until the controller goes away.
pub async fn follow_status(mut rx: watch::Receiver<StatusSignal>) {
    loop {
        let line = status_line(&rx.borrow_and_update());
        println!("{line}");
        if rx.changed().await.is_err() {
            break;
        }
    }
}
