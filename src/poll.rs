//! Continuous frame acquisition and connection-health reporting.
//!
//! [`FramePoller`] drives the fetch cycle: grab the current frame, and when
//! its id changes, grab the matching analysis results and hand both to the
//! observer. An embedded tracker turns the outcome of each cycle into
//! edge-triggered [`ConnectionState`] notifications: the observer hears
//! about transitions, never about a state it is already in.
//!
//! # State machine
//!
//! ```text
//!            delivery                    soft miss
//! (unknown) ──────────> Connected ──────────────────> Reconnecting
//!                        ▲    │                            │
//!                        │    │ hard failure,              │ delivery
//!                        │    │ reconnect seen             │
//!              delivery  │    ▼                            │
//!                        └── Failed <──────────────────────┘
//! ```
//!
//! A hard failure is only escalated to `Failed` when a Reconnecting episode
//! has already happened; a failure landing on an unbroken Connected streak
//! stays silent and the loop simply backs off and retries.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::types::{Frame, InferenceResult};

/// Connection health as reported to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames and results are flowing.
    Connected,
    /// Data stopped arriving; the poller keeps trying.
    Reconnecting,
    /// A degraded connection broke down entirely.
    Failed,
}

impl ConnectionState {
    /// Short status label for UI display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting...",
            Self::Failed => "Failed",
        }
    }
}

/// Callbacks a viewer implements to consume poller output.
///
/// Both callbacks run synchronously on the poller task, in production order;
/// implementations that need another thread (UI marshalling) hand off
/// themselves. The poller does not wait on anything: it fires and moves on
/// to its next delay.
pub trait PollObserver {
    /// A new frame and its analysis results were fetched. Fired once per
    /// distinct, fully-resolved capture.
    fn on_new_frame(&self, frame: &Frame, results: &InferenceResult);

    /// The connection state changed. Fired on transitions only, never twice
    /// in a row with the same value.
    fn on_state_changed(&self, state: ConnectionState);
}

/// Pacing configuration for the poll cycle.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between iterations while data is flowing (or merely absent).
    pub poll_interval: Duration,
    /// Longer pause after a failed cycle, to avoid a tight retry loop.
    pub failure_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            failure_backoff: Duration::from_millis(1500),
        }
    }
}

/// Edge-triggered connection state tracker.
///
/// Starts in an implicit unknown state: nothing is reported until the first
/// transition-worthy event. `reconnect_seen` records that a Reconnecting
/// episode has happened and is only cleared when a `Failed` transition
/// consumes it.
#[derive(Debug, Default)]
struct ConnectionTracker {
    state: Option<ConnectionState>,
    reconnect_seen: bool,
}

impl ConnectionTracker {
    /// A cycle delivered a frame with results.
    fn record_delivery(&mut self) -> Option<ConnectionState> {
        if self.state == Some(ConnectionState::Connected) {
            return None;
        }
        self.state = Some(ConnectionState::Connected);
        Some(ConnectionState::Connected)
    }

    /// A cycle completed without error but produced no usable data.
    fn record_soft_miss(&mut self) -> Option<ConnectionState> {
        if self.state != Some(ConnectionState::Connected) {
            return None;
        }
        self.state = Some(ConnectionState::Reconnecting);
        self.reconnect_seen = true;
        Some(ConnectionState::Reconnecting)
    }

    /// A cycle aborted on a request error.
    fn record_hard_failure(&mut self) -> Option<ConnectionState> {
        if self.state != Some(ConnectionState::Connected) || !self.reconnect_seen {
            return None;
        }
        self.state = Some(ConnectionState::Failed);
        self.reconnect_seen = false;
        Some(ConnectionState::Failed)
    }
}

/// Outcome of one poll cycle, driving state tracking and pacing.
enum Cycle {
    /// New frame + results delivered to the observer.
    Delivered,
    /// Frame id unchanged since the previous cycle; nothing to do.
    Unchanged,
    /// Completed without error but without usable data.
    SoftMiss,
    /// Aborted on a request error.
    HardFailure,
}

/// Continuously fetches the current frame and its analysis results.
///
/// The poller owns its [`ApiClient`]: one session, one cursor, one task. To
/// watch several backends, build one poller per backend.
pub struct FramePoller<O> {
    client: ApiClient,
    observer: O,
    config: PollConfig,
    last_image_id: String,
    tracker: ConnectionTracker,
}

impl<O: PollObserver> FramePoller<O> {
    /// Create a poller with default pacing.
    pub fn new(client: ApiClient, observer: O) -> Self {
        Self::with_config(client, observer, PollConfig::default())
    }

    /// Create a poller with custom pacing.
    pub fn with_config(client: ApiClient, observer: O, config: PollConfig) -> Self {
        Self {
            client,
            observer,
            config,
            last_image_id: String::new(),
            tracker: ConnectionTracker::default(),
        }
    }

    /// Run the acquisition cycle until `cancel` is triggered.
    ///
    /// Every failure mode inside the cycle degrades to "wait and try again";
    /// nothing terminates the loop besides cancellation. Cancellation is
    /// honored at the top of each iteration and across every await, and stops
    /// the loop quietly: stopped is not `Failed` and no final notification
    /// is emitted.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!("frame poller started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.cycle() => outcome,
            };

            let (transition, delay) = match outcome {
                Cycle::Delivered => (self.tracker.record_delivery(), self.config.poll_interval),
                Cycle::Unchanged => (None, self.config.poll_interval),
                Cycle::SoftMiss => (self.tracker.record_soft_miss(), self.config.poll_interval),
                Cycle::HardFailure => (
                    self.tracker.record_hard_failure(),
                    self.config.failure_backoff,
                ),
            };

            if let Some(state) = transition {
                tracing::info!(state = state.label(), "connection state changed");
                self.observer.on_state_changed(state);
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        tracing::info!("frame poller stopped");
    }

    /// One fetch cycle: frame, then results when the frame id changed.
    async fn cycle(&mut self) -> Cycle {
        let frame = match self.client.fetch_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::warn!("no frame available");
                return Cycle::SoftMiss;
            }
            Err(error) => {
                tracing::warn!(%error, "frame fetch failed");
                return Cycle::HardFailure;
            }
        };

        if frame.image_id == self.last_image_id {
            return Cycle::Unchanged;
        }

        let results = match self.client.fetch_results().await {
            Ok(Some(results)) => results,
            Ok(None) => {
                // Advance the cursor anyway so one broken capture cannot
                // trigger a results fetch on every subsequent cycle.
                tracing::warn!(image_id = %frame.image_id, "no results available");
                self.last_image_id = frame.image_id;
                return Cycle::SoftMiss;
            }
            Err(error) => {
                tracing::warn!(%error, "results fetch failed");
                return Cycle::HardFailure;
            }
        };

        if results.image_id != frame.image_id {
            // The backend rotated captures between the two calls; skip this
            // one rather than pair mismatched data.
            tracing::warn!(
                frame_id = %frame.image_id,
                results_id = %results.image_id,
                "frame/results id mismatch"
            );
            self.last_image_id = frame.image_id;
            return Cycle::SoftMiss;
        }

        self.last_image_id = frame.image_id.clone();
        self.observer.on_new_frame(&frame, &results);
        Cycle::Delivered
    }
}
