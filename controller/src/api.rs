//! HTTP client for the recording appliance.
//!
//! Controllers talk to the appliance through the [`BoothApi`] trait so the
//! state machines can run against scripted fakes; [`HttpApi`] is the real
//! implementation on top of `reqwest`.

use std::future::Future;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::{Response, StatusCode};
use tracing::{debug, info};

use booth_common::config::Config;
use booth_common::protocol::{ArchivedListing, ErrorBody, MessageBody, Settings};

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The appliance answered, but not with the expected status.
    #[error("{status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Rejected {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("connection failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// `true` when the appliance could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Timeout)
    }

    /// The server-supplied `detail`, if this is a rejection that carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Raw metadata of the latest video, straight from the response headers.
///
/// Parsing into display values happens in the discovery controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestProbe {
    /// Final URL of the response; used for playback and download.
    pub url: String,
    pub content_disposition: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: Option<String>,
}

/// The remote calls the controllers depend on.
pub trait BoothApi {
    /// `POST /api/recording/start`; `Ok` only on `202 Accepted`.
    fn start_recording(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /api/videos/move-to-old`.
    fn move_latest_to_archive(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /api/videos/latest`; `Ok(None)` when there is no video
    /// (non-success status or empty body).
    fn probe_latest(&self) -> impl Future<Output = Result<Option<LatestProbe>, ApiError>> + Send;

    /// `GET /api/videos/old`.
    fn list_archived(&self) -> impl Future<Output = Result<ArchivedListing, ApiError>> + Send;

    /// `GET /api/settings`.
    fn get_settings(&self) -> impl Future<Output = Result<Settings, ApiError>> + Send;

    /// `POST /api/settings`; returns the appliance's confirmation message.
    fn save_settings(
        &self,
        settings: &Settings,
    ) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;

    /// Static download location of an archived video.
    fn archived_locator(&self, name: &str) -> String;
}

/// [`BoothApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Cannot create HTTP client")?;
        Ok(HttpApi {
            client,
            base_url: config.appliance_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl BoothApi for HttpApi {
    async fn start_recording(&self) -> Result<(), ApiError> {
        let resp = self.client.post(self.url("/api/recording/start")).send().await?;
        if resp.status() == StatusCode::ACCEPTED {
            info!("Appliance accepted recording request");
            Ok(())
        } else {
            Err(rejection(resp).await)
        }
    }

    async fn move_latest_to_archive(&self) -> Result<(), ApiError> {
        let resp = self.client.post(self.url("/api/videos/move-to-old")).send().await?;
        if resp.status().is_success() {
            debug!("Latest video moved to archive");
            Ok(())
        } else {
            Err(rejection(resp).await)
        }
    }

    async fn probe_latest(&self) -> Result<Option<LatestProbe>, ApiError> {
        let mut resp = self.client.get(self.url("/api/videos/latest")).send().await?;
        if !resp.status().is_success() {
            debug!("GET /api/videos/latest returned {}", resp.status());
            return Ok(None);
        }

        let probe = LatestProbe {
            url: resp.url().to_string(),
            content_disposition: header_text(resp.headers(), CONTENT_DISPOSITION.as_str()),
            last_modified: header_text(resp.headers(), LAST_MODIFIED.as_str()),
            content_length: header_text(resp.headers(), CONTENT_LENGTH.as_str()),
        };

        // Only the first non-empty chunk matters; the video itself is not
        // downloaded.
        while let Some(chunk) = resp.chunk().await? {
            if !chunk.is_empty() {
                return Ok(Some(probe));
            }
        }
        debug!("Latest video body is empty");
        Ok(None)
    }

    async fn list_archived(&self) -> Result<ArchivedListing, ApiError> {
        let resp = self.client.get(self.url("/api/videos/old")).send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        Ok(resp.json::<ArchivedListing>().await?)
    }

    async fn get_settings(&self) -> Result<Settings, ApiError> {
        let resp = self.client.get(self.url("/api/settings")).send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        Ok(resp.json::<Settings>().await?)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Option<String>, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/settings"))
            .json(settings)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        let body: MessageBody = resp.json().await.unwrap_or_default();
        Ok(body.message)
    }

    fn archived_locator(&self, name: &str) -> String {
        self.url(&format!("/videos/old/{name}"))
    }
}

// ── helpers ──────────────────────────────────────────────────────────────

/// Turn a non-success response into [`ApiError::Rejected`], reading the
/// JSON `detail` field when the body has one.
async fn rejection(resp: Response) -> ApiError {
    let status = resp.status();
    let detail = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail_text());
    ApiError::Rejected { status, detail }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stub_appliance;

    fn api_for(appliance: &stub_appliance::StubAppliance) -> HttpApi {
        let config = Config {
            appliance_url: appliance.base_url(),
            ..Config::default()
        };
        HttpApi::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_start_recording_accepted() {
        let appliance = stub_appliance::spawn(stub_appliance::Script::default()).await;
        let api = api_for(&appliance);
        assert_eq!(api.start_recording().await, Ok(()));
        assert_eq!(appliance.start_calls(), 1);
    }

    #[tokio::test]
    async fn test_start_recording_rejected_with_detail() {
        let appliance = stub_appliance::spawn(stub_appliance::Script {
            start_rejection: Some("OBS is not connected".into()),
            ..Default::default()
        })
        .await;
        let api = api_for(&appliance);
        let err = api.start_recording().await.unwrap_err();
        assert_eq!(err.detail(), Some("OBS is not connected"));
        assert!(!err.is_connection());
    }

    #[tokio::test]
    async fn test_probe_latest_reads_headers() {
        let appliance = stub_appliance::spawn(stub_appliance::Script {
            latest: Some(stub_appliance::Latest {
                filename: "clip_01.mp4".into(),
                body: vec![7u8; 1536],
            }),
            ..Default::default()
        })
        .await;
        let api = api_for(&appliance);
        let probe = api.probe_latest().await.unwrap().unwrap();
        assert!(probe.url.ends_with("/api/videos/latest"));
        assert_eq!(
            probe.content_disposition.as_deref(),
            Some(r#"attachment; filename="clip_01.mp4""#)
        );
        assert_eq!(probe.content_length.as_deref(), Some("1536"));
        assert_eq!(
            probe.last_modified.as_deref(),
            Some(stub_appliance::LAST_MODIFIED)
        );
    }

    #[tokio::test]
    async fn test_probe_latest_absent_and_empty() {
        let appliance = stub_appliance::spawn(stub_appliance::Script::default()).await;
        let api = api_for(&appliance);
        assert_eq!(api.probe_latest().await, Ok(None));

        let appliance = stub_appliance::spawn(stub_appliance::Script {
            latest: Some(stub_appliance::Latest {
                filename: "empty.mp4".into(),
                body: Vec::new(),
            }),
            ..Default::default()
        })
        .await;
        let api = api_for(&appliance);
        assert_eq!(api.probe_latest().await, Ok(None));
    }

    #[tokio::test]
    async fn test_list_archived_and_move() {
        let appliance = stub_appliance::spawn(stub_appliance::Script {
            archived: vec!["b.mp4".into(), "a.mp4".into()],
            ..Default::default()
        })
        .await;
        let api = api_for(&appliance);
        api.move_latest_to_archive().await.unwrap();
        assert_eq!(appliance.move_calls(), 1);
        let listing = api.list_archived().await.unwrap();
        assert_eq!(listing.videos, vec!["b.mp4", "a.mp4"]);
        assert_eq!(
            api.archived_locator("a.mp4"),
            format!("{}/videos/old/a.mp4", appliance.base_url())
        );
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let appliance = stub_appliance::spawn(stub_appliance::Script::default()).await;
        let api = api_for(&appliance);
        let mut settings = api.get_settings().await.unwrap();
        settings.standby_delay = 7;
        let message = api.save_settings(&settings).await.unwrap();
        assert_eq!(message.as_deref(), Some("Settings updated successfully"));
        assert_eq!(api.get_settings().await.unwrap().standby_delay, 7);
    }

    #[tokio::test]
    async fn test_unreachable_appliance_is_transport_error() {
        let config = Config {
            // Port 9 (discard) on loopback is closed in test environments.
            appliance_url: "http://127.0.0.1:9".into(),
            ..Config::default()
        };
        let api = HttpApi::new(&config).unwrap();
        let err = api.start_recording().await.unwrap_err();
        assert!(err.is_connection(), "unexpected error: {err:?}");
    }
}
