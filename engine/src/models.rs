use serde::{Deserialize, Serialize};

pub use shared::{
    ApiError, CarbonCalculateData, GeoPoint, LocationInfo, ModeSegment, RouteAlternative,
    RouteRecommendData, RouteStep, TransitDetails, TransportMode, TransportModeSegment, TravelMode,
    TripCancelData, TripCompletePayload, TripCompletionData, TripSaveData, TripState, TripTrackData,
};

use crate::{
    mode_segments::ModeDistance,
    route_analysis::{RouteAnalysis, TrackingMode},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteAnalysisRequest {
    #[serde(default)]
    pub route_points: Vec<GeoPoint>,
    #[serde(default)]
    pub route_steps: Option<Vec<RouteStep>>,
}

#[derive(Debug, Serialize)]
pub struct RouteAnalysisResponse {
    pub analysis: RouteAnalysis,
    pub tracking_mode: TrackingMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenderPlanRequest {
    #[serde(default)]
    pub route_points: Vec<GeoPoint>,
    #[serde(default)]
    pub route_steps: Option<Vec<RouteStep>>,
    #[serde(default)]
    pub selected_mode: Option<TransportMode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FallbackAllocationRequest {
    pub total_points: usize,
    pub step_distances: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FallbackAllocationResponse {
    /// `None` when the overview has to be drawn as one polyline.
    pub ranges: Option<Vec<PointRange>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TripCompletionRequest {
    pub segments: Vec<ModeSegment>,
    #[serde(default)]
    pub ml_confidence: f64,
    #[serde(default)]
    pub selected_mode: Option<TransportMode>,
    pub distance_meters: f64,
}

#[derive(Debug, Serialize)]
pub struct TripCompletionResponse {
    pub completion: TripCompletionData,
    pub breakdown: Vec<ModeDistance>,
    pub transport_modes: Vec<TransportModeSegment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MilestoneCheckRequest {
    pub distance_meters: f64,
    #[serde(default)]
    pub reached: Vec<f64>,
    /// Falls back to the configured sequence.
    #[serde(default)]
    pub milestones: Option<Vec<f64>>,
    #[serde(default)]
    pub selected_mode: Option<TransportMode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MilestoneCheckResponse {
    pub milestone: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartTripRequest {
    pub origin: Option<GeoPoint>,
    #[serde(default)]
    pub location: Option<LocationInfo>,
    #[serde(default)]
    pub route_points: Vec<GeoPoint>,
    #[serde(default)]
    pub route_steps: Option<Vec<RouteStep>>,
    #[serde(default)]
    pub selected_mode: Option<TransportMode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModeSampleRequest {
    pub mode: TransportMode,
    pub confidence: f64,
    /// Defaults to the server clock, like the stop timestamp.
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationSampleRequest {
    pub point: GeoPoint,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopTripRequest {
    #[serde(default)]
    pub end_point: Option<GeoPoint>,
    #[serde(default)]
    pub end_location: Option<LocationInfo>,
    /// Defaults to the server clock.
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CancelTripRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePreference {
    LowCarbon,
    Balanced,
    ByMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteQuery {
    #[serde(default)]
    pub origin: Option<GeoPoint>,
    #[serde(default)]
    pub current_location: Option<GeoPoint>,
    #[serde(default)]
    pub destination: Option<GeoPoint>,
    pub preference: RoutePreference,
    #[serde(default)]
    pub mode: Option<TransportMode>,
}
