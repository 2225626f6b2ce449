//! System status overview for the admin view: how many archived videos
//! exist and whether a latest recording is available.

use tracing::warn;

use crate::api::BoothApi;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemStatus {
    /// `None` when the archive listing could not be fetched.
    pub archived_count: Option<usize>,
    pub latest_available: bool,
}

impl SystemStatus {
    /// Number of videos in the "latest" slot (0 or 1).
    pub fn latest_count(&self) -> usize {
        usize::from(self.latest_available)
    }

    pub fn last_recording_label(&self) -> &'static str {
        if self.latest_available {
            "Available"
        } else {
            "None"
        }
    }
}

/// Query both video endpoints.  Failures degrade to "unknown"/"none".
pub async fn poll_status<A: BoothApi>(api: &A) -> SystemStatus {
    let archived_count = match api.list_archived().await {
        Ok(listing) => Some(listing.videos.len()),
        Err(e) => {
            warn!("Cannot list archived videos: {e}");
            None
        }
    };

    let latest_available = match api.probe_latest().await {
        Ok(probe) => probe.is_some(),
        Err(e) => {
            warn!("Cannot probe latest video: {e}");
            false
        }
    };

    SystemStatus {
        archived_count,
        latest_available,
    }
}
