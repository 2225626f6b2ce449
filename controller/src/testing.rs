//! Test doubles: a scripted in-memory [`BoothApi`] and an HTTP stub of the
//! appliance.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use booth_common::protocol::{ArchivedListing, Settings};

use crate::api::{ApiError, BoothApi, LatestProbe};

/// Scripted [`BoothApi`] that records every call it receives.
#[derive(Default)]
pub struct FakeApi {
    start: Mutex<VecDeque<Result<(), ApiError>>>,
    start_delay: Mutex<Duration>,
    move_result: Mutex<Option<ApiError>>,
    latest: Mutex<VecDeque<Result<Option<LatestProbe>, ApiError>>>,
    archived: Mutex<Option<Result<ArchivedListing, ApiError>>>,
    settings: Mutex<Settings>,
    save_rejection: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next `start_recording` (default: accepted).
    pub fn with_start(self, result: Result<(), ApiError>) -> Self {
        self.start.lock().unwrap().push_back(result);
        self
    }

    /// Delay every `start_recording` answer by `delay` (virtual time in
    /// paused tests).
    pub fn with_start_delay(self, delay: Duration) -> Self {
        *self.start_delay.lock().unwrap() = delay;
        self
    }

    pub fn with_move_failure(self, err: ApiError) -> Self {
        *self.move_result.lock().unwrap() = Some(err);
        self
    }

    /// Queue a probe result (default once exhausted: no video).
    pub fn with_latest(self, result: Result<Option<LatestProbe>, ApiError>) -> Self {
        self.latest.lock().unwrap().push_back(result);
        self
    }

    pub fn with_archived(self, result: Result<ArchivedListing, ApiError>) -> Self {
        *self.archived.lock().unwrap() = Some(result);
        self
    }

    pub fn with_settings(self, settings: Settings) -> Self {
        *self.settings.lock().unwrap() = settings;
        self
    }

    pub fn with_save_rejection(self, err: ApiError) -> Self {
        *self.save_rejection.lock().unwrap() = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn stored_settings(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

/// A probe as the appliance would answer for `name`.
pub fn probe(name: &str, size: u64) -> LatestProbe {
    LatestProbe {
        url: "http://booth.test/api/videos/latest".into(),
        content_disposition: Some(format!("attachment; filename=\"{name}\"")),
        last_modified: Some("Mon, 19 Oct 2026 14:30:05 GMT".into()),
        content_length: Some(size.to_string()),
    }
}

impl BoothApi for FakeApi {
    async fn start_recording(&self) -> Result<(), ApiError> {
        self.record("start");
        let delay = *self.start_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let next = self.start.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn move_latest_to_archive(&self) -> Result<(), ApiError> {
        self.record("move");
        match self.move_result.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn probe_latest(&self) -> Result<Option<LatestProbe>, ApiError> {
        self.record("latest");
        let next = self.latest.lock().unwrap().pop_front();
        next.unwrap_or(Ok(None))
    }

    async fn list_archived(&self) -> Result<ArchivedListing, ApiError> {
        self.record("archived");
        let scripted = self.archived.lock().unwrap().clone();
        scripted.unwrap_or_else(|| Ok(ArchivedListing::default()))
    }

    async fn get_settings(&self) -> Result<Settings, ApiError> {
        self.record("get_settings");
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Option<String>, ApiError> {
        self.record("save_settings");
        if let Some(err) = self.save_rejection.lock().unwrap().clone() {
            return Err(err);
        }
        *self.settings.lock().unwrap() = settings.clone();
        Ok(Some("Settings updated successfully".into()))
    }

    fn archived_locator(&self, name: &str) -> String {
        format!("http://booth.test/videos/old/{name}")
    }
}

/// In-process HTTP stub of the appliance, bound to an ephemeral port.
///
/// Routes:
///   POST /api/recording/start     → 202, or 409 with `detail`
///   POST /api/videos/move-to-old  → 200
///   GET  /api/videos/latest       → video bytes, or 404
///   GET  /api/videos/old          → `{ "videos": [...] }`
///   GET  /api/settings            → settings JSON
///   POST /api/settings            → store and acknowledge
pub mod stub_appliance {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{header, StatusCode};
    use axum::response::{IntoResponse, Json, Response};
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::json;
    use tokio::net::TcpListener;

    use booth_common::protocol::Settings;

    pub const LAST_MODIFIED: &str = "Mon, 19 Oct 2026 14:30:05 GMT";

    #[derive(Debug, Clone, Default)]
    pub struct Latest {
        pub filename: String,
        pub body: Vec<u8>,
    }

    /// What the stub answers.
    #[derive(Debug, Clone, Default)]
    pub struct Script {
        pub start_rejection: Option<String>,
        pub latest: Option<Latest>,
        pub archived: Vec<String>,
    }

    #[derive(Clone)]
    struct AppState {
        script: Arc<Script>,
        settings: Arc<Mutex<Settings>>,
        starts: Arc<AtomicUsize>,
        moves: Arc<AtomicUsize>,
    }

    pub struct StubAppliance {
        addr: SocketAddr,
        starts: Arc<AtomicUsize>,
        moves: Arc<AtomicUsize>,
        task: tokio::task::JoinHandle<()>,
    }

    impl StubAppliance {
        pub fn base_url(&self) -> String {
            format!("http://{}", self.addr)
        }

        pub fn start_calls(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        pub fn move_calls(&self) -> usize {
            self.moves.load(Ordering::SeqCst)
        }
    }

    impl Drop for StubAppliance {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    pub async fn spawn(script: Script) -> StubAppliance {
        let state = AppState {
            script: Arc::new(script),
            settings: Arc::new(Mutex::new(Settings::default())),
            starts: Arc::new(AtomicUsize::new(0)),
            moves: Arc::new(AtomicUsize::new(0)),
        };
        let starts = state.starts.clone();
        let moves = state.moves.clone();

        let app = Router::new()
            .route("/api/recording/start", post(start_recording))
            .route("/api/videos/move-to-old", post(move_to_old))
            .route("/api/videos/latest", get(latest_video))
            .route("/api/videos/old", get(old_videos))
            .route("/api/settings", get(get_settings).post(update_settings))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        StubAppliance {
            addr,
            starts,
            moves,
            task,
        }
    }

    // ── route handlers ───────────────────────────────────────────────

    async fn start_recording(State(state): State<AppState>) -> Response {
        state.starts.fetch_add(1, Ordering::SeqCst);
        match &state.script.start_rejection {
            Some(detail) => (StatusCode::CONFLICT, Json(json!({ "detail": detail }))).into_response(),
            None => (
                StatusCode::ACCEPTED,
                Json(json!({ "message": "Recording process started." })),
            )
                .into_response(),
        }
    }

    async fn move_to_old(State(state): State<AppState>) -> Json<serde_json::Value> {
        state.moves.fetch_add(1, Ordering::SeqCst);
        Json(json!({ "message": "Video moved to old folder." }))
    }

    async fn latest_video(State(state): State<AppState>) -> Response {
        match &state.script.latest {
            Some(latest) => (
                [
                    (header::CONTENT_TYPE, "video/mp4".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", latest.filename),
                    ),
                    (header::LAST_MODIFIED, LAST_MODIFIED.to_string()),
                ],
                latest.body.clone(),
            )
                .into_response(),
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "No latest video found." })),
            )
                .into_response(),
        }
    }

    async fn old_videos(State(state): State<AppState>) -> Json<serde_json::Value> {
        Json(json!({ "videos": state.script.archived }))
    }

    async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
        Json(state.settings.lock().unwrap().clone())
    }

    async fn update_settings(
        State(state): State<AppState>,
        Json(settings): Json<Settings>,
    ) -> Json<serde_json::Value> {
        *state.settings.lock().unwrap() = settings.clone();
        Json(json!({ "message": "Settings updated successfully", "settings": settings }))
    }
}
