//! Video discovery: which recording is current, which are archived, and a
//! background re-poll that notices when a new recording shows up.
//!
//! The re-poll is edge-triggered.  A successful probe only refreshes the
//! view when the previous state had no latest video; polls that find the
//! already-known video change nothing.  A poll that finds no video clears
//! the cached one, so the next video to appear is a fresh edge.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use booth_common::format::{self, DATE_UNAVAILABLE, SIZE_UNAVAILABLE};

use crate::api::{BoothApi, LatestProbe};

/// Metadata for the latest or an archived video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDescriptor {
    pub name: String,
    pub last_modified: Option<DateTime<FixedOffset>>,
    pub size_bytes: Option<u64>,
    /// Where to play or download the video.
    pub locator: String,
}

impl VideoDescriptor {
    /// Describe the latest video from its response headers.  Headers that
    /// are missing or malformed leave the matching field empty.
    pub fn from_probe(probe: &LatestProbe) -> Self {
        let last_modified = probe.last_modified.as_deref().and_then(format::parse_http_date);
        let size_bytes = probe
            .content_length
            .as_deref()
            .and_then(|v| v.trim().parse().ok());
        if last_modified.is_none() || size_bytes.is_none() {
            debug!(
                "Latest video metadata incomplete (last-modified={:?}, content-length={:?})",
                probe.last_modified, probe.content_length
            );
        }
        VideoDescriptor {
            name: format::latest_video_name(probe.content_disposition.as_deref()),
            last_modified,
            size_bytes,
            locator: probe.url.clone(),
        }
    }

    /// Archived entries only carry a name and a predictable location.
    pub fn archived(name: &str, locator: String) -> Self {
        VideoDescriptor {
            name: name.to_string(),
            last_modified: None,
            size_bytes: None,
            locator,
        }
    }

    pub fn date_label(&self) -> String {
        self.last_modified
            .as_ref()
            .map(format::format_timestamp)
            .unwrap_or_else(|| DATE_UNAVAILABLE.to_string())
    }

    pub fn size_label(&self) -> String {
        self.size_bytes
            .map(format::format_file_size)
            .unwrap_or_else(|| SIZE_UNAVAILABLE.to_string())
    }
}

/// Everything the download view shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryState {
    /// `true` iff the last latest-video probe found a non-empty video.
    pub has_latest: bool,
    pub latest: Option<VideoDescriptor>,
    /// Server order, never re-sorted.
    pub archived: Vec<VideoDescriptor>,
}

impl DiscoveryState {
    /// Replace the latest-video part of the state.
    pub fn with_latest(self, latest: Option<VideoDescriptor>) -> Self {
        DiscoveryState {
            has_latest: latest.is_some(),
            latest,
            ..self
        }
    }

    /// Replace the archived list.
    pub fn with_archived(self, archived: Vec<VideoDescriptor>) -> Self {
        DiscoveryState { archived, ..self }
    }
}

/// Result of one background poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A video appeared where there was none; the view was refreshed.
    NewVideo,
    /// The cached latest video is gone (e.g. moved to the archive).
    VideoGone,
    Unchanged,
}

/// Owns the [`DiscoveryState`] and keeps it current.
pub struct DiscoveryController<A> {
    api: A,
    state: watch::Sender<DiscoveryState>,
}

impl<A: BoothApi> DiscoveryController<A> {
    pub fn new(api: A) -> Self {
        let (state, _rx) = watch::channel(DiscoveryState::default());
        DiscoveryController { api, state }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn subscribe(&self) -> watch::Receiver<DiscoveryState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DiscoveryState {
        self.state.borrow().clone()
    }

    /// Probe the latest video and replace the latest-video state.
    ///
    /// Any failure counts as "no video".  Returns the new `has_latest`.
    pub async fn refresh_latest(&self) -> bool {
        let latest = match self.api.probe_latest().await {
            Ok(Some(probe)) => Some(VideoDescriptor::from_probe(&probe)),
            Ok(None) => None,
            Err(e) => {
                warn!("Cannot fetch latest video: {e}");
                None
            }
        };
        if let Some(video) = &latest {
            info!("Latest video: {} ({})", video.name, video.size_label());
        }
        let has_latest = latest.is_some();
        self.state.send_modify(|s| *s = std::mem::take(s).with_latest(latest));
        has_latest
    }

    /// Replace the archived list with the appliance's listing.
    pub async fn refresh_archived(&self) {
        let archived = match self.api.list_archived().await {
            Ok(listing) => listing
                .videos
                .iter()
                .map(|name| VideoDescriptor::archived(name, self.api.archived_locator(name)))
                .collect(),
            Err(e) => {
                warn!("Cannot list archived videos: {e}");
                Vec::new()
            }
        };
        debug!("{} archived video(s)", archived.len());
        self.state
            .send_modify(|s| *s = std::mem::take(s).with_archived(archived));
    }

    pub async fn refresh_all(&self) {
        self.refresh_latest().await;
        self.refresh_archived().await;
    }

    /// One tick of the background loop.
    pub async fn poll_once(&self) -> PollOutcome {
        let had_latest = self.state.borrow().has_latest;
        match self.api.probe_latest().await {
            Ok(Some(_)) if !had_latest => {
                info!("New video detected, refreshing");
                self.refresh_all().await;
                PollOutcome::NewVideo
            }
            Ok(None) if had_latest => {
                info!("Latest video no longer available");
                self.state
                    .send_modify(|s| *s = std::mem::take(s).with_latest(None));
                PollOutcome::VideoGone
            }
            Ok(_) => {
                debug!("No change in latest video");
                PollOutcome::Unchanged
            }
            Err(e) => {
                debug!("Cannot check for new videos: {e}");
                PollOutcome::Unchanged
            }
        }
    }

    /// Re-poll every `period` until `shutdown` turns true or its sender
    /// goes away.  The first poll happens one full period after the call.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow_and_update() {
            return;
        }
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Polling for new videos every {}s", period.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Video polling stopped");
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
