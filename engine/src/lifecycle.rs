//! Trip tracking state machine.
//!
//! ```text
//! Idle|Completed --start--> Starting --ok--> Tracking{id} --stop--> Stopping --> Completed
//!                               `--err--> Idle          `--cancel ok--> Idle
//! ```
//!
//! State and session data live behind one `std::sync::Mutex` that is never held
//! across an `.await`. Every state write happens under that lock and is
//! published on a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    carbon::{DEFAULT_MILESTONES_M, MilestoneTracker, build_trip_completion},
    error::{ServiceError, TripError},
    geo_math::distance_m,
    mode_segments::{self, close_last_segment},
    models::{
        CarbonCalculateData, GeoPoint, LocationInfo, ModeSegment, RouteStep, TransportMode,
        TransportModeSegment, TripCancelData, TripCompletePayload, TripCompletionData,
        TripSaveData, TripState,
    },
    navigation::{ProgressUpdate, RouteProgress},
    route_analysis::{TrackingMode, determine_tracking_mode},
    service::TripService,
};

/// Trip id used when tracking is resumed without a known backend id.
pub const RESTORED_TRIP_ID: &str = "restored-trip";

/// Whether the backend can accept uploads for `trip_id`.
pub fn is_valid_trip_id(trip_id: &str) -> bool {
    !trip_id.trim().is_empty() && trip_id != RESTORED_TRIP_ID
}

#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub origin: Option<GeoPoint>,
    pub location: Option<LocationInfo>,
    /// Planned route, empty when the user tracks without navigation.
    pub route_points: Vec<GeoPoint>,
    pub route_steps: Option<Vec<RouteStep>>,
    pub selected_mode: Option<TransportMode>,
}

#[derive(Debug, Clone)]
pub struct StopRequest {
    pub end_point: Option<GeoPoint>,
    pub end_location: Option<LocationInfo>,
    pub now_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionSync {
    Skipped {
        reason: String,
    },
    SaveFailed {
        error: String,
    },
    Saved {
        save: TripSaveData,
        carbon: Option<CarbonCalculateData>,
        carbon_error: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StopOutcome {
    pub trip_id: String,
    pub completion: TripCompletionData,
    pub payload: Option<TripCompletePayload>,
    pub sync: CompletionSync,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CancelOutcome {
    Canceled(TripCancelData),
    NothingToCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationUpdate {
    pub distance_m: f64,
    pub milestone: Option<f64>,
    pub progress: Option<ProgressUpdate>,
}

/// Read-only copy of the running session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub segments: Vec<ModeSegment>,
    pub distance_m: f64,
    pub reached_milestones: Vec<f64>,
    pub track_len: usize,
    pub last_confidence: f64,
    pub tracking_mode: TrackingMode,
    pub selected_mode: Option<TransportMode>,
}

#[derive(Debug)]
struct Session {
    segments: Vec<ModeSegment>,
    milestones: MilestoneTracker,
    distance_m: f64,
    track: Vec<GeoPoint>,
    last_confidence: f64,
    tracking_mode: TrackingMode,
    selected_mode: Option<TransportMode>,
    progress: Option<RouteProgress>,
}

impl Session {
    fn new(milestones: &[f64]) -> Self {
        Self {
            segments: Vec::new(),
            milestones: MilestoneTracker::new(milestones.to_vec()),
            distance_m: 0.0,
            track: Vec::new(),
            last_confidence: 0.0,
            tracking_mode: TrackingMode::default(),
            selected_mode: None,
            progress: None,
        }
    }

    /// Distance and path a finished trip is reported with. A navigated trip
    /// counts the traveled part of the planned route; otherwise the GPS track
    /// is closed with the leg to `end`.
    fn finish_path(&mut self, end: Option<GeoPoint>) -> (f64, Vec<GeoPoint>) {
        if let Some(progress) = &self.progress {
            return (progress.traveled_m(), progress.traveled_points().to_vec());
        }
        if let Some(end) = end {
            if let Some(last) = self.track.last() {
                self.distance_m += distance_m(*last, end);
            }
            self.track.push(end);
        }
        (self.distance_m, self.track.clone())
    }

    /// Clears everything recorded for the previous trip.
    fn reset(&mut self) {
        self.segments.clear();
        self.milestones.reset();
        self.distance_m = 0.0;
        self.track.clear();
        self.last_confidence = 0.0;
        self.tracking_mode = TrackingMode::default();
        self.selected_mode = None;
        self.progress = None;
    }
}

#[derive(Debug)]
struct Inner {
    session: Session,
    cancel_in_flight: bool,
}

pub struct TripLifecycle {
    service: Arc<dyn TripService>,
    user_id: String,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<TripState>,
}

impl TripLifecycle {
    pub fn new(service: Arc<dyn TripService>, user_id: impl Into<String>) -> Self {
        Self::with_milestones(service, user_id, DEFAULT_MILESTONES_M.to_vec())
    }

    pub fn with_milestones(
        service: Arc<dyn TripService>,
        user_id: impl Into<String>,
        milestones: Vec<f64>,
    ) -> Self {
        let (state_tx, _) = watch::channel(TripState::Idle);
        Self {
            service,
            user_id: user_id.into(),
            inner: Mutex::new(Inner {
                session: Session::new(&milestones),
                cancel_in_flight: false,
            }),
            state_tx,
        }
    }

    pub fn state(&self) -> TripState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TripState> {
        self.state_tx.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // session data stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: TripState) {
        info!("trip state -> {state:?}");
        self.state_tx.send_replace(state);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        let session = &inner.session;
        SessionSnapshot {
            segments: session.segments.clone(),
            distance_m: session.distance_m,
            reached_milestones: session.milestones.reached().iter().collect(),
            track_len: session.track.len(),
            last_confidence: session.last_confidence,
            tracking_mode: session.tracking_mode,
            selected_mode: session.selected_mode,
        }
    }

    /// Starts a new trip and returns its id.
    ///
    /// Rejected without contacting the service while another transition is
    /// pending or a trip is already running.
    pub async fn start_tracking(&self, request: StartRequest) -> Result<String, TripError> {
        let origin = {
            let _inner = self.lock();
            match &*self.state_tx.borrow() {
                TripState::Starting | TripState::Stopping => {
                    return Err(TripError::TransitionInFlight)
                }
                TripState::Tracking { .. } => return Err(TripError::AlreadyTracking),
                TripState::Idle | TripState::Completed => {}
            }
            let origin = request.origin.ok_or(TripError::MissingOrigin)?;
            self.set_state(TripState::Starting);
            origin
        };

        let result = self
            .service
            .start_trip_tracking(&self.user_id, origin, request.location.clone())
            .await
            .and_then(|data| {
                if data.trip_id.trim().is_empty() {
                    Err(ServiceError::InvalidResponse("empty trip id".to_string()))
                } else {
                    Ok(data)
                }
            });

        let mut inner = self.lock();
        match result {
            Ok(data) => {
                let session = &mut inner.session;
                session.reset();
                session.track.push(origin);
                session.tracking_mode =
                    determine_tracking_mode(&request.route_points, request.route_steps.as_deref());
                session.selected_mode = request.selected_mode;
                if session.tracking_mode.is_navigation_mode {
                    session.progress = Some(RouteProgress::new(request.route_points));
                }
                self.set_state(TripState::Tracking {
                    trip_id: data.trip_id.clone(),
                });
                Ok(data.trip_id)
            }
            Err(err) => {
                error!("failed to start trip: {err}");
                self.set_state(TripState::Idle);
                Err(err.into())
            }
        }
    }

    /// Ends the running trip.
    ///
    /// The state reaches `Completed` before any request is made; upload
    /// failures are reported in the outcome and never revert it.
    pub async fn stop_tracking(&self, request: StopRequest) -> Result<StopOutcome, TripError> {
        let (trip_id, completion, payload, modes_used) = {
            let mut inner = self.lock();
            let trip_id = match &*self.state_tx.borrow() {
                TripState::Tracking { trip_id } => trip_id.clone(),
                TripState::Starting | TripState::Stopping => {
                    return Err(TripError::TransitionInFlight)
                }
                TripState::Idle | TripState::Completed => return Err(TripError::NotTracking),
            };
            if inner.cancel_in_flight {
                return Err(TripError::TransitionInFlight);
            }
            self.set_state(TripState::Stopping);

            let session = &mut inner.session;
            close_last_segment(&mut session.segments, request.now_ms);
            let (trip_distance_m, path) = session.finish_path(request.end_point);
            let selected = session.selected_mode;
            let completion = build_trip_completion(
                &session.segments,
                session.last_confidence,
                selected.map(TransportMode::dict_value),
                trip_distance_m,
                selected,
            );
            let payload = request.end_point.map(|end| TripCompletePayload {
                end_point: end,
                end_location: request.end_location.clone(),
                distance: trip_distance_m / 1000.0,
                detected_mode: completion.detected_mode.clone(),
                ml_confidence: completion.ml_confidence,
                is_green_trip: completion.is_green_trip,
                carbon_saved: completion.carbon_saved_grams,
                transport_modes: transport_modes(
                    &session.segments,
                    trip_distance_m,
                    &completion.user_selected_mode,
                ),
                polyline_points: path,
            });
            let modes_used = modes_used(&session.segments, &completion.user_selected_mode);
            session.reset();

            self.set_state(TripState::Completed);
            (trip_id, completion, payload, modes_used)
        };

        let sync = match (&payload, is_valid_trip_id(&trip_id)) {
            (_, false) => skipped(format!("trip id {trip_id:?} is not known to the backend")),
            (None, true) => skipped("end location unavailable".to_string()),
            (Some(payload), true) => {
                self.sync_completion(&trip_id, payload, request.now_ms, modes_used)
                    .await
            }
        };

        Ok(StopOutcome {
            trip_id,
            completion,
            payload,
            sync,
        })
    }

    async fn sync_completion(
        &self,
        trip_id: &str,
        payload: &TripCompletePayload,
        now_ms: i64,
        modes_used: Vec<String>,
    ) -> CompletionSync {
        let save = match self
            .service
            .save_trip(
                trip_id,
                &self.user_id,
                payload.end_point,
                payload.end_location.clone(),
                payload.distance,
                iso_timestamp(now_ms),
            )
            .await
        {
            Ok(save) => save,
            Err(err) => {
                error!("failed to save trip {trip_id}: {err}");
                return CompletionSync::SaveFailed {
                    error: err.to_string(),
                };
            }
        };

        match self.service.calculate_carbon(trip_id, modes_used).await {
            Ok(carbon) => CompletionSync::Saved {
                save,
                carbon: Some(carbon),
                carbon_error: None,
            },
            Err(err) => {
                warn!("carbon calculation failed for {trip_id}: {err}");
                CompletionSync::Saved {
                    save,
                    carbon: None,
                    carbon_error: Some(err.to_string()),
                }
            }
        }
    }

    /// Cancels the running trip. A cancel issued while the trip is still
    /// starting waits for the start to resolve first.
    pub async fn cancel_tracking(&self, reason: Option<String>) -> Result<CancelOutcome, TripError> {
        let mut rx = self.state_tx.subscribe();
        // the sender lives as long as self, so this cannot observe a closed channel
        let _ = rx.wait_for(|state| *state != TripState::Starting).await;
        drop(rx);

        let trip_id = {
            let mut inner = self.lock();
            let trip_id = match &*self.state_tx.borrow() {
                TripState::Tracking { trip_id } => trip_id.clone(),
                TripState::Stopping => return Err(TripError::TransitionInFlight),
                _ => {
                    debug!("cancel requested with no active trip");
                    return Ok(CancelOutcome::NothingToCancel);
                }
            };
            if inner.cancel_in_flight {
                return Err(TripError::TransitionInFlight);
            }
            inner.cancel_in_flight = true;
            trip_id
        };

        let result = self
            .service
            .cancel_trip_tracking(&trip_id, &self.user_id, reason)
            .await;

        let mut inner = self.lock();
        inner.cancel_in_flight = false;
        match result {
            Ok(data) => {
                inner.session.reset();
                self.set_state(TripState::Idle);
                Ok(CancelOutcome::Canceled(data))
            }
            Err(err) => {
                error!("failed to cancel trip {trip_id}: {err}");
                Err(err.into())
            }
        }
    }

    /// Applies one classifier sample. Ignored unless a trip is being tracked.
    pub fn record_mode(&self, mode: TransportMode, confidence: f64, now_ms: i64) -> bool {
        let mut inner = self.lock();
        if !self.state_tx.borrow().is_tracking() {
            return false;
        }
        let session = &mut inner.session;
        mode_segments::observe(&mut session.segments, mode, now_ms);
        session.last_confidence = confidence;
        true
    }

    /// Applies one GPS fix and reports a newly reached milestone.
    ///
    /// With a planned route the traveled route distance counts; otherwise the
    /// length of the recorded track does.
    pub fn record_location(&self, point: GeoPoint) -> Option<LocationUpdate> {
        let mut inner = self.lock();
        if !self.state_tx.borrow().is_tracking() {
            return None;
        }
        let session = &mut inner.session;
        if let Some(last) = session.track.last() {
            session.distance_m += distance_m(*last, point);
        }
        session.track.push(point);

        let progress = session.progress.as_mut().and_then(|p| p.update(point));
        let counted_m = progress.map_or(session.distance_m, |p| p.traveled_m);
        let milestone = session.milestones.advance(counted_m);
        if let Some(m) = milestone {
            info!("milestone reached: {m} m");
        }

        Some(LocationUpdate {
            distance_m: counted_m,
            milestone,
            progress,
        })
    }

    /// Re-enters `Tracking` after the UI was recreated while the tracker kept
    /// running. Returns `false` when a trip is already active or pending.
    pub fn restore_tracking(&self, trip_id: Option<String>) -> bool {
        let mut inner = self.lock();
        if !self.state_tx.borrow().can_start() {
            return false;
        }
        let trip_id = trip_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| RESTORED_TRIP_ID.to_string());
        inner.session.reset();
        self.set_state(TripState::Tracking { trip_id });
        true
    }
}

fn skipped(reason: String) -> CompletionSync {
    warn!("completion upload skipped: {reason}");
    CompletionSync::Skipped { reason }
}

/// Modes sent for carbon scoring; the user's mode stands in when the classifier
/// produced nothing.
fn modes_used(segments: &[ModeSegment], user_selected_mode: &str) -> Vec<String> {
    let mut modes: Vec<String> = Vec::new();
    for segment in segments {
        let mode = segment.mode.dict_value();
        if !modes.iter().any(|m| m == mode) {
            modes.push(mode.to_string());
        }
    }
    if modes.is_empty() {
        modes.push(user_selected_mode.to_string());
    }
    modes
}

/// Per-mode distances for the upload; a single segment of the user's mode
/// when the classifier produced nothing.
fn transport_modes(
    segments: &[ModeSegment],
    distance_m: f64,
    user_selected_mode: &str,
) -> Vec<TransportModeSegment> {
    let mut modes = mode_segments::to_transport_mode_segments(segments, distance_m);
    if modes.is_empty() {
        modes.push(TransportModeSegment {
            mode: user_selected_mode.to_string(),
            sub_distance: distance_m / 1000.0,
            sub_duration: 0,
        });
    }
    modes
}

fn iso_timestamp(now_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(now_ms)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
