//! Recording lifecycle: trigger a recording on the appliance and walk the
//! operator through its phases.
//!
//! The appliance reports no progress, so once it accepts a request every
//! later phase change comes from a local, open-loop [`Timeline`].  All
//! timeline entries are offsets from the single instant the acceptance
//! arrived; each runs as its own task, so a late task never delays the
//! ones after it.  Tasks publish in timeline order only: an entry never
//! overwrites a later one that already fired.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use booth_common::config::TimelineConfig;

use crate::api::{ApiError, BoothApi};

/// Message shown when the appliance cannot be reached.
pub const CONNECTION_ERROR_MESSAGE: &str = "Server connection error";

/// One step of a recording attempt, as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingPhase {
    Ready,
    Standby,
    Recording,
    Processing,
    Completed,
    Error,
}

impl RecordingPhase {
    /// Status category rendered by the view (`status-<category>`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Standby => "standby",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Whether a new recording may be triggered from this phase.
    pub fn accepts_trigger(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    fn message(&self) -> &'static str {
        match self {
            Self::Ready => "Ready to start",
            Self::Standby => "Preparing camera...",
            Self::Recording => "Recording video...",
            Self::Processing => "Processing video...",
            Self::Completed => "Recording complete!",
            Self::Error => "Recording error",
        }
    }
}

impl fmt::Display for RecordingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the view renders: the phase, a message, and whether the trigger
/// control is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSignal {
    pub phase: RecordingPhase,
    pub message: String,
    pub trigger_enabled: bool,
}

impl StatusSignal {
    pub fn for_phase(phase: RecordingPhase) -> Self {
        StatusSignal {
            phase,
            message: phase.message().to_string(),
            trigger_enabled: phase.accepts_trigger(),
        }
    }

    fn failed(err: &ApiError) -> Self {
        let message = if err.is_connection() {
            CONNECTION_ERROR_MESSAGE.to_string()
        } else {
            format!(
                "{}: {}",
                RecordingPhase::Error.message(),
                err.detail().unwrap_or("Unknown error")
            )
        };
        StatusSignal {
            phase: RecordingPhase::Error,
            message,
            trigger_enabled: true,
        }
    }
}

/// A phase change scheduled at a fixed offset from acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub offset: Duration,
    pub phase: RecordingPhase,
}

/// The simulated progress of a recording, ordered by offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    transitions: Vec<ScheduledTransition>,
}

impl Timeline {
    /// Build the timeline from configured durations.
    ///
    /// Standby ends in `Processing` unless `simulate_recording_phase` is
    /// set, in which case `Recording` is shown for the recording duration
    /// first.  `Completed` always lands at standby + recording + processing
    /// and `Ready` follows after the display interval.
    pub fn from_config(config: &TimelineConfig) -> Self {
        let completed = config.standby + config.recording + config.processing;
        let mut transitions = Vec::with_capacity(4);
        if config.simulate_recording_phase {
            transitions.push(ScheduledTransition {
                offset: config.standby,
                phase: RecordingPhase::Recording,
            });
            transitions.push(ScheduledTransition {
                offset: config.standby + config.recording,
                phase: RecordingPhase::Processing,
            });
        } else {
            transitions.push(ScheduledTransition {
                offset: config.standby,
                phase: RecordingPhase::Processing,
            });
        }
        transitions.push(ScheduledTransition {
            offset: completed,
            phase: RecordingPhase::Completed,
        });
        transitions.push(ScheduledTransition {
            offset: completed + config.completed_display,
            phase: RecordingPhase::Ready,
        });
        Timeline { transitions }
    }

    pub fn transitions(&self) -> &[ScheduledTransition] {
        &self.transitions
    }

    /// Offset of the first transition into `phase`.
    pub fn offset_of(&self, phase: RecordingPhase) -> Option<Duration> {
        self.transitions
            .iter()
            .find(|t| t.phase == phase)
            .map(|t| t.offset)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::from_config(&TimelineConfig::default())
    }
}

/// Timeline whose standby and recording durations come from the
/// appliance settings, so the simulation follows what the operator
/// configured.  Falls back to `base` when the settings cannot be loaded.
pub async fn appliance_timeline<A: BoothApi>(api: &A, base: TimelineConfig) -> Timeline {
    match api.get_settings().await {
        Ok(settings) => Timeline::from_config(
            &base.with_appliance_durations(settings.standby_delay, settings.recording_duration),
        ),
        Err(e) => {
            warn!("Cannot load appliance settings, using configured timeline: {e}");
            Timeline::from_config(&base)
        }
    }
}

/// A recording accepted by the appliance whose timeline is still running.
///
/// Dropped when the timeline publishes its final transition, or on cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    /// Wall-clock time of the trigger.
    pub started_at: DateTime<Utc>,
    /// Anchor for every scheduled transition.
    pub accepted_at: Instant,
    pub timeline: Timeline,
}

/// Transition tasks of one session.
#[derive(Debug)]
struct SessionTimers {
    /// Lowest timeline index still allowed to publish.  `usize::MAX` once
    /// the session is cancelled or superseded.
    next: Arc<AtomicUsize>,
    pending: Vec<JoinHandle<()>>,
}

impl SessionTimers {
    fn abort(&self) {
        self.next.store(usize::MAX, Ordering::SeqCst);
        for handle in &self.pending {
            handle.abort();
        }
    }
}

type SessionSlot = Arc<Mutex<Option<RecordingSession>>>;

fn lock_session(slot: &Mutex<Option<RecordingSession>>) -> MutexGuard<'_, Option<RecordingSession>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("a recording is already in progress (phase: {0})")]
    SessionActive(RecordingPhase),
}

/// Drives one recording attempt at a time.
///
/// Dropping the controller aborts any transitions still pending.
pub struct LifecycleController<A> {
    api: A,
    timeline: Timeline,
    status: Arc<watch::Sender<StatusSignal>>,
    session: SessionSlot,
    timers: Option<SessionTimers>,
}

impl<A: BoothApi> LifecycleController<A> {
    pub fn new(api: A, timeline: Timeline) -> Self {
        let (tx, _rx) = watch::channel(StatusSignal::for_phase(RecordingPhase::Ready));
        LifecycleController {
            api,
            timeline,
            status: Arc::new(tx),
            session: Arc::new(Mutex::new(None)),
            timers: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Use `timeline` for the next triggered recording.
    pub fn set_timeline(&mut self, timeline: Timeline) {
        self.timeline = timeline;
    }

    /// Receive every status change.
    pub fn subscribe(&self) -> watch::Receiver<StatusSignal> {
        self.status.subscribe()
    }

    pub fn status(&self) -> StatusSignal {
        self.status.borrow().clone()
    }

    pub fn phase(&self) -> RecordingPhase {
        self.status.borrow().phase
    }

    /// The running session, if any.
    pub fn session(&self) -> Option<RecordingSession> {
        lock_session(&self.session).clone()
    }

    /// Start a recording.
    ///
    /// Archives the current latest video (best effort), then asks the
    /// appliance to record.  Remote failures never surface as `Err`: they
    /// leave the controller in [`RecordingPhase::Error`] with the trigger
    /// enabled.  Returns the phase the controller is in afterwards.
    pub async fn trigger(&mut self) -> Result<RecordingPhase, LifecycleError> {
        let phase = self.phase();
        if !phase.accepts_trigger() {
            return Err(LifecycleError::SessionActive(phase));
        }
        self.clear_session();

        let started_at = Utc::now();
        self.publish(StatusSignal::for_phase(RecordingPhase::Standby));

        if let Err(e) = self.api.move_latest_to_archive().await {
            warn!("Archiving the previous video failed (continuing): {e}");
        }

        match self.api.start_recording().await {
            Ok(()) => {
                let accepted_at = Instant::now();
                // The session must exist before any task can fire and
                // clear it.
                *lock_session(&self.session) = Some(RecordingSession {
                    started_at,
                    accepted_at,
                    timeline: self.timeline.clone(),
                });

                let next = Arc::new(AtomicUsize::new(0));
                let last = self.timeline.transitions().len().saturating_sub(1);
                let pending = self
                    .timeline
                    .transitions()
                    .iter()
                    .enumerate()
                    .map(|(index, t)| {
                        self.schedule(accepted_at, index, *t, index == last, Arc::clone(&next))
                    })
                    .collect();
                self.timers = Some(SessionTimers { next, pending });
                info!(
                    "Recording accepted; completion expected in {:?}",
                    self.timeline.offset_of(RecordingPhase::Completed)
                );
                Ok(RecordingPhase::Standby)
            }
            Err(e) => {
                warn!("Recording request failed: {e}");
                self.publish(StatusSignal::failed(&e));
                Ok(RecordingPhase::Error)
            }
        }
    }

    /// Drop every pending transition and return to `Ready`.
    pub fn cancel(&mut self) {
        if self.clear_session() {
            info!("Recording session cancelled");
        }
        self.publish(StatusSignal::for_phase(RecordingPhase::Ready));
    }

    /// Abort the current timers and forget the session.  Returns whether a
    /// session was still running.
    fn clear_session(&mut self) -> bool {
        if let Some(timers) = self.timers.take() {
            timers.abort();
        }
        lock_session(&self.session).take().is_some()
    }

    fn schedule(
        &self,
        anchor: Instant,
        index: usize,
        transition: ScheduledTransition,
        is_last: bool,
        next: Arc<AtomicUsize>,
    ) -> JoinHandle<()> {
        let status = Arc::clone(&self.status);
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            tokio::time::sleep_until(anchor + transition.offset).await;
            // Entries sharing an offset wake together and may run in any
            // order; a later entry that already published wins.
            let published = status.send_if_modified(|current| {
                if next.load(Ordering::SeqCst) > index {
                    return false;
                }
                next.store(index + 1, Ordering::SeqCst);
                *current = StatusSignal::for_phase(transition.phase);
                if is_last {
                    lock_session(&session).take();
                }
                true
            });
            if published {
                info!("Recording phase → {}", transition.phase);
            }
        })
    }

    fn publish(&self, signal: StatusSignal) {
        info!("Recording phase → {} ({})", signal.phase, signal.message);
        self.status.send_replace(signal);
    }
}

impl<A> Drop for LifecycleController<A> {
    fn drop(&mut self) {
        if let Some(timers) = &self.timers {
            timers.abort();
        }
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
