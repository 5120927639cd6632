// Handlers driving the in-process trip session over HTTP

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

use crate::error::TripError;
use crate::lifecycle::{CancelOutcome, LocationUpdate, StartRequest, StopOutcome, StopRequest};
use crate::models::{
    ApiError, CancelTripRequest, LocationSampleRequest, ModeSampleRequest, RouteQuery,
    StartTripRequest, StopTripRequest, TripState,
};
use crate::planner::PlannedRoute;
use crate::presentation::{TrackingUiState, tracking_ui_state};
use crate::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Serialize)]
pub struct TripStateResponse {
    pub state: TripState,
    pub ui: TrackingUiState,
}

#[derive(Debug, Serialize)]
pub struct StartTripResponse {
    pub trip_id: String,
}

/// GET /api/trip/state
pub async fn trip_state(State(state): State<AppState>) -> Json<TripStateResponse> {
    let current = state.trips.state();
    Json(TripStateResponse {
        ui: tracking_ui_state(&current),
        state: current,
    })
}

/// POST /api/trip/start
pub async fn start_trip(
    State(state): State<AppState>,
    Json(req): Json<StartTripRequest>,
) -> ApiResult<StartTripResponse> {
    let request = StartRequest {
        origin: req.origin,
        location: req.location,
        route_points: req.route_points,
        route_steps: req.route_steps,
        selected_mode: req.selected_mode,
    };
    state
        .trips
        .start_tracking(request)
        .await
        .map(|trip_id| Json(StartTripResponse { trip_id }))
        .map_err(trip_error_to_api_error)
}

/// POST /api/trip/mode - classifier sample, 409 outside a trip
pub async fn record_mode(
    State(state): State<AppState>,
    Json(req): Json<ModeSampleRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let now_ms = req.timestamp_ms.unwrap_or_else(server_now_ms);
    if state.trips.record_mode(req.mode, req.confidence, now_ms) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(trip_error_to_api_error(TripError::NotTracking))
    }
}

/// POST /api/trip/location
pub async fn record_location(
    State(state): State<AppState>,
    Json(req): Json<LocationSampleRequest>,
) -> ApiResult<LocationUpdate> {
    state
        .trips
        .record_location(req.point)
        .map(Json)
        .ok_or_else(|| trip_error_to_api_error(TripError::NotTracking))
}

/// POST /api/trip/stop
pub async fn stop_trip(
    State(state): State<AppState>,
    Json(req): Json<StopTripRequest>,
) -> ApiResult<StopOutcome> {
    let request = StopRequest {
        end_point: req.end_point,
        end_location: req.end_location,
        now_ms: req.timestamp_ms.unwrap_or_else(server_now_ms),
    };
    state
        .trips
        .stop_tracking(request)
        .await
        .map(Json)
        .map_err(trip_error_to_api_error)
}

/// POST /api/trip/cancel
pub async fn cancel_trip(
    State(state): State<AppState>,
    Json(req): Json<CancelTripRequest>,
) -> ApiResult<CancelOutcome> {
    state
        .trips
        .cancel_tracking(req.reason)
        .await
        .map(Json)
        .map_err(trip_error_to_api_error)
}

/// POST /api/route/plan
pub async fn plan_route(
    State(state): State<AppState>,
    Json(query): Json<RouteQuery>,
) -> ApiResult<PlannedRoute> {
    state
        .planner
        .plan(&query)
        .await
        .map(Json)
        .map_err(trip_error_to_api_error)
}

/// Clock used for samples that arrive without a client timestamp.
fn server_now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn trip_error_to_api_error(err: TripError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        TripError::MissingOrigin | TripError::MissingDestination => StatusCode::BAD_REQUEST,
        TripError::AlreadyTracking | TripError::TransitionInFlight | TripError::NotTracking => {
            StatusCode::CONFLICT
        }
        TripError::Service(_) => StatusCode::BAD_GATEWAY,
    };

    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn precondition_errors_are_client_errors() {
        let (status, body) = trip_error_to_api_error(TripError::MissingDestination);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Please set a destination first");
        assert_eq!(trip_error_to_api_error(TripError::TransitionInFlight).0, StatusCode::CONFLICT);
    }

    #[test]
    fn service_errors_are_gateway_errors() {
        let err = TripError::Service(ServiceError::Transport("connection reset".into()));
        let (status, body) = trip_error_to_api_error(err);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.message.contains("connection reset"));
    }
}
