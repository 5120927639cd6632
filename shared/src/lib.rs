use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lng: self.lng + (other.lng - self.lng) * t,
            lat: self.lat + (other.lat - self.lat) * t,
        }
    }
}

/// Travel mode of a single route step, as reported by the route provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    Walking,
    Transit,
    Driving,
    Bicycling,
    #[serde(other)]
    Other,
}

impl TravelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Walking => "WALKING",
            TravelMode::Transit => "TRANSIT",
            TravelMode::Driving => "DRIVING",
            TravelMode::Bicycling => "BICYCLING",
            TravelMode::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitDetails {
    pub line_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_short_name: Option<String>,
    pub departure_stop: String,
    pub arrival_stop: String,
    pub num_stops: u32,
    pub vehicle_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headsign: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub duration: i64,
    pub travel_mode: TravelMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit_details: Option<TransitDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline_points: Option<Vec<GeoPoint>>,
}

impl RouteStep {
    pub fn has_polyline(&self) -> bool {
        self.polyline_points
            .as_ref()
            .is_some_and(|points| !points.is_empty())
    }
}

/// Transport mode shared by the classifier output, the user's selection and
/// the carbon tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walking,
    Cycling,
    Bus,
    Subway,
    Driving,
    Unknown,
}

impl TransportMode {
    pub const ALL: [TransportMode; 6] = [
        TransportMode::Walking,
        TransportMode::Cycling,
        TransportMode::Bus,
        TransportMode::Subway,
        TransportMode::Driving,
        TransportMode::Unknown,
    ];

    /// Short value used by the trip backend (`walk`, `bike`, `bus`, `subway`, `car`).
    /// Unclassified samples are reported as walking.
    pub fn dict_value(self) -> &'static str {
        match self {
            TransportMode::Walking => "walk",
            TransportMode::Cycling => "bike",
            TransportMode::Bus => "bus",
            TransportMode::Subway => "subway",
            TransportMode::Driving => "car",
            TransportMode::Unknown => "walk",
        }
    }

    pub fn from_dict_value(value: &str) -> Option<Self> {
        match value {
            "walk" => Some(TransportMode::Walking),
            "bike" => Some(TransportMode::Cycling),
            "bus" => Some(TransportMode::Bus),
            "subway" => Some(TransportMode::Subway),
            "car" => Some(TransportMode::Driving),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TransportMode::Walking => "Walking",
            TransportMode::Cycling => "Cycling",
            TransportMode::Bus => "Bus",
            TransportMode::Subway => "Subway",
            TransportMode::Driving => "Driving",
            TransportMode::Unknown => "Unknown",
        }
    }
}

/// Contiguous stretch of time during which the classifier reported one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSegment {
    pub mode: TransportMode,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

impl ModeSegment {
    pub fn starting_at(mode: TransportMode, now_ms: i64) -> Self {
        Self {
            mode,
            start_time_ms: now_ms,
            end_time_ms: now_ms,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end_time_ms - self.start_time_ms).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TripState {
    Idle,
    Starting,
    Tracking { trip_id: String },
    Stopping,
    Completed,
}

impl TripState {
    pub fn trip_id(&self) -> Option<&str> {
        match self {
            TripState::Tracking { trip_id } => Some(trip_id),
            _ => None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, TripState::Tracking { .. })
    }

    /// `Idle` and `Completed` both accept a new trip.
    pub fn can_start(&self) -> bool {
        matches!(self, TripState::Idle | TripState::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripCompletionData {
    pub detected_mode: Option<String>,
    pub user_selected_mode: String,
    pub is_green_trip: bool,
    /// Grams.
    pub carbon_saved_grams: i64,
    pub ml_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAlternative {
    pub index: u32,
    /// Kilometres.
    pub total_distance: f64,
    /// Minutes.
    pub estimated_duration: i64,
    pub total_carbon: f64,
    pub route_points: Vec<GeoPoint>,
    pub route_steps: Vec<RouteStep>,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRecommendData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_type: Option<String>,
    /// Kilometres.
    #[serde(default)]
    pub total_distance: f64,
    /// Minutes.
    #[serde(default)]
    pub estimated_duration: i64,
    #[serde(default)]
    pub total_carbon: f64,
    #[serde(default)]
    pub carbon_saved: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_points: Option<Vec<GeoPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_steps: Option<Vec<RouteStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_alternatives: Option<Vec<RouteAlternative>>,
    /// Older backends only return this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub green_route: Option<Vec<GeoPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl RouteRecommendData {
    /// Points to draw: `route_points`, else the legacy `green_route`, else nothing.
    pub fn display_points(&self) -> Vec<GeoPoint> {
        self.route_points
            .clone()
            .or_else(|| self.green_route.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripTrackData {
    pub trip_id: String,
    pub start_time: String,
    #[serde(default = "default_tracking_status")]
    pub status: String,
}

fn default_tracking_status() -> String {
    "tracking".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripCancelData {
    pub trip_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_time: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSaveData {
    pub trip_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonCalculateData {
    /// Kilograms.
    #[serde(default)]
    pub total_carbon_emission: f64,
    /// Kilograms.
    pub carbon_saved: f64,
    #[serde(default)]
    pub green_points: i64,
    #[serde(default)]
    pub transport_breakdown: HashMap<String, f64>,
}

/// One entry of the per-mode breakdown uploaded with a finished trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportModeSegment {
    pub mode: String,
    /// Kilometres.
    pub sub_distance: f64,
    /// Seconds.
    pub sub_duration: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripCompletePayload {
    pub end_point: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_location: Option<LocationInfo>,
    /// Kilometres.
    pub distance: f64,
    pub detected_mode: Option<String>,
    pub ml_confidence: Option<f64>,
    pub is_green_trip: bool,
    /// Grams.
    pub carbon_saved: i64,
    pub transport_modes: Vec<TransportModeSegment>,
    pub polyline_points: Vec<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
