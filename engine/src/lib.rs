pub mod carbon;
pub mod config;
pub mod error;
pub mod fallback;
pub mod geo_math;
pub mod lifecycle;
pub mod mode_segments;
pub mod models;
pub mod navigation;
pub mod planner;
pub mod presentation;
pub mod route_analysis;
pub mod service;
pub mod trip_handlers;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::carbon::{ReachedMilestones, build_trip_completion, check_milestone};
use crate::config::EngineConfig;
use crate::fallback::partition_overview;
use crate::lifecycle::TripLifecycle;
use crate::mode_segments::{to_time_weighted_breakdown, to_transport_mode_segments};
use crate::models::{
    FallbackAllocationRequest, FallbackAllocationResponse, MilestoneCheckRequest,
    MilestoneCheckResponse, PointRange, RenderPlanRequest, RouteAnalysisRequest,
    RouteAnalysisResponse, TransportMode, TripCompletionRequest, TripCompletionResponse,
};
use crate::planner::RoutePlanner;
use crate::presentation::milestone_message;
use crate::route_analysis::{RenderPlan, analyze_route, determine_tracking_mode, plan_route_rendering};
use crate::service::TripService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub trips: Arc<TripLifecycle>,
    pub planner: Arc<RoutePlanner>,
}

impl AppState {
    pub fn new(config: EngineConfig, service: Arc<dyn TripService>) -> Self {
        let trips = TripLifecycle::with_milestones(
            service.clone(),
            config.user_id.clone(),
            config.milestones.clone(),
        );
        let planner = RoutePlanner::new(service, config.user_id.clone());
        Self {
            config: Arc::new(config),
            trips: Arc::new(trips),
            planner: Arc::new(planner),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/route/analysis", post(route_analysis_handler))
        .route("/api/route/render-plan", post(render_plan_handler))
        .route("/api/route/plan", post(trip_handlers::plan_route))
        .route("/api/fallback/allocate", post(fallback_handler))
        .route("/api/trip/completion", post(trip_completion_handler))
        .route("/api/milestone/check", post(milestone_handler))
        .route("/api/trip/state", get(trip_handlers::trip_state))
        .route("/api/trip/start", post(trip_handlers::start_trip))
        .route("/api/trip/mode", post(trip_handlers::record_mode))
        .route("/api/trip/location", post(trip_handlers::record_location))
        .route("/api/trip/stop", post(trip_handlers::stop_trip))
        .route("/api/trip/cancel", post(trip_handlers::cancel_trip))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn route_analysis_handler(Json(req): Json<RouteAnalysisRequest>) -> Json<RouteAnalysisResponse> {
    let steps = req.route_steps.as_deref();
    Json(RouteAnalysisResponse {
        analysis: analyze_route(steps),
        tracking_mode: determine_tracking_mode(&req.route_points, steps),
    })
}

async fn render_plan_handler(Json(req): Json<RenderPlanRequest>) -> Json<RenderPlan> {
    Json(plan_route_rendering(
        &req.route_points,
        req.route_steps.as_deref(),
        req.selected_mode,
    ))
}

async fn fallback_handler(Json(req): Json<FallbackAllocationRequest>) -> Json<FallbackAllocationResponse> {
    let ranges = partition_overview(req.total_points, &req.step_distances).map(|ranges| {
        ranges
            .into_iter()
            .map(|range| PointRange {
                start: range.start,
                end: range.end,
            })
            .collect()
    });
    Json(FallbackAllocationResponse { ranges })
}

async fn trip_completion_handler(Json(req): Json<TripCompletionRequest>) -> Json<TripCompletionResponse> {
    let completion = build_trip_completion(
        &req.segments,
        req.ml_confidence,
        req.selected_mode.map(TransportMode::dict_value),
        req.distance_meters,
        req.selected_mode,
    );
    Json(TripCompletionResponse {
        completion,
        breakdown: to_time_weighted_breakdown(&req.segments, req.distance_meters),
        transport_modes: to_transport_mode_segments(&req.segments, req.distance_meters),
    })
}

async fn milestone_handler(
    State(state): State<AppState>,
    Json(req): Json<MilestoneCheckRequest>,
) -> Json<MilestoneCheckResponse> {
    let milestones = req
        .milestones
        .unwrap_or_else(|| state.config.milestones.clone());
    let reached = ReachedMilestones::from_values(&req.reached, &milestones);
    let milestone = check_milestone(req.distance_meters, &milestones, &reached);

    Json(MilestoneCheckResponse {
        milestone,
        message: milestone.map(|m| milestone_message(m, req.selected_mode)),
    })
}
