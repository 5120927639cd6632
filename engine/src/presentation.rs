//! Text and visibility decisions for the map screen.

use serde::Serialize;

use crate::{
    carbon::{carbon_color_hex, eco_rating_stars, saved_grams},
    models::{RouteRecommendData, TransportMode, TripState},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingUiState {
    pub button_text: &'static str,
    pub button_enabled: bool,
    pub chip_group_visible: bool,
    pub search_visible: bool,
    pub route_info_visible: bool,
    pub hide_timer: bool,
    pub is_idle: bool,
}

pub fn tracking_ui_state(state: &TripState) -> TrackingUiState {
    let at_rest = |is_idle| TrackingUiState {
        button_text: "start_tracking",
        button_enabled: true,
        chip_group_visible: true,
        search_visible: true,
        route_info_visible: false,
        hide_timer: true,
        is_idle,
    };
    let busy = |button_text| TrackingUiState {
        button_text,
        button_enabled: false,
        chip_group_visible: false,
        search_visible: false,
        route_info_visible: false,
        hide_timer: false,
        is_idle: false,
    };

    match state {
        TripState::Idle => at_rest(true),
        TripState::Completed => at_rest(false),
        TripState::Starting => busy("Starting..."),
        TripState::Stopping => busy("Stopping..."),
        TripState::Tracking { .. } => TrackingUiState {
            button_text: "stop_tracking",
            button_enabled: true,
            route_info_visible: true,
            ..busy("stop_tracking")
        },
    }
}

pub fn route_type_text(route_type: Option<&str>) -> &'static str {
    match route_type {
        Some("low_carbon") => "Low Carbon Route",
        Some("balanced") => "Balanced Route",
        _ => "Recommended Route",
    }
}

pub fn eco_rating(total_carbon_kg: f64, distance_km: f64) -> String {
    "⭐".repeat(eco_rating_stars(total_carbon_kg, distance_km) as usize)
}

pub fn carbon_saved_text(carbon_saved_kg: f64, total_carbon_kg: f64) -> String {
    if carbon_saved_kg > 0.0 {
        format!("🌍 Reduced {carbon_saved_kg:.2} kg CO₂ vs driving")
    } else {
        format!("Carbon emission: {total_carbon_kg:.2} kg")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfoTexts {
    pub route_type_text: &'static str,
    pub carbon_saved_text: String,
    pub carbon_color_hex: &'static str,
    pub eco_rating: String,
    pub header_text: String,
    pub duration_text: String,
    pub show_cumulative_impact: bool,
    pub show_route_options: bool,
    pub show_route_steps: bool,
}

/// Duration prefers `estimated_duration` when positive, then the legacy
/// `duration` field, then zero.
pub fn route_info_texts(route: &RouteRecommendData, has_transit_steps: bool) -> RouteInfoTexts {
    let route_type_text = route_type_text(route.route_type.as_deref());
    let eco_rating = eco_rating(route.total_carbon, route.total_distance);
    let duration_minutes = Some(route.estimated_duration)
        .filter(|d| *d > 0)
        .or(route.duration)
        .unwrap_or(0);

    RouteInfoTexts {
        route_type_text,
        carbon_saved_text: carbon_saved_text(route.carbon_saved, route.total_carbon),
        carbon_color_hex: carbon_color_hex(route.total_carbon),
        header_text: format!("{route_type_text}  Eco Rating: {eco_rating}"),
        eco_rating,
        duration_text: format!("Estimated: {duration_minutes} min"),
        show_cumulative_impact: route.carbon_saved > 0.0,
        show_route_options: route
            .route_alternatives
            .as_ref()
            .is_some_and(|alts| !alts.is_empty()),
        show_route_steps: has_transit_steps,
    }
}

pub fn mode_icon(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Walking => "🚶",
        TransportMode::Cycling => "🚴",
        TransportMode::Bus => "🚌",
        TransportMode::Subway => "🚇",
        TransportMode::Driving => "🚗",
        TransportMode::Unknown => "❓",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeDetectionText {
    pub detected_mode: &'static str,
    pub icon: &'static str,
    pub text: &'static str,
    pub confidence_percent: u8,
    pub navigation_text: String,
    pub tracking_text: String,
}

pub fn mode_detection_text(mode: TransportMode, confidence: f64) -> ModeDetectionText {
    let icon = mode_icon(mode);
    let text = mode.display_name();
    let pct = (confidence.clamp(0.0, 1.0) * 100.0) as u8;
    ModeDetectionText {
        detected_mode: mode.dict_value(),
        icon,
        text,
        confidence_percent: pct,
        navigation_text: format!("{icon} Current transport: {text} ({pct}%)"),
        tracking_text: format!("{icon} Detected: {text} ({pct}%)"),
    }
}

pub fn encouragement_message(distance_meters: f64, mode: Option<TransportMode>) -> String {
    let saved = mode.map_or(0.0, |m| saved_grams(distance_meters / 1000.0, m));
    match mode {
        Some(TransportMode::Walking | TransportMode::Cycling) if saved >= 1.0 => {
            format!("Carbon reduced {saved:.0} g | Keep it up 💪")
        }
        Some(TransportMode::Walking | TransportMode::Cycling) => "Green travel | Keep it up 💪".to_string(),
        Some(TransportMode::Bus | TransportMode::Subway) if saved >= 1.0 => {
            format!("Green travel in progress 🚌 | Carbon reduced {saved:.0} g")
        }
        Some(TransportMode::Bus | TransportMode::Subway) => "Green travel in progress 🚌".to_string(),
        _ => format!("Traveled: {:.2} km", distance_meters / 1000.0),
    }
}

pub fn milestone_message(milestone_meters: f64, mode: Option<TransportMode>) -> String {
    let saved = mode.map_or(0.0, |m| saved_grams(milestone_meters / 1000.0, m));
    match mode {
        Some(TransportMode::Walking) => {
            format!("Congrats! You've walked {milestone_meters:.0} m, carbon reduced {saved:.0} g 🎉")
        }
        Some(TransportMode::Cycling) => {
            format!("Congrats! You've cycled {milestone_meters:.0} m, carbon reduced {saved:.0} g 🚴")
        }
        Some(TransportMode::Bus | TransportMode::Subway) => {
            format!("Congrats! You've traveled {milestone_meters:.0} m, carbon reduced {saved:.0} g 🌱")
        }
        _ => format!("Congrats! You've traveled {milestone_meters:.0} m"),
    }
}

/// `MM:SS`, or `H:MM:SS` from one hour on.
pub fn format_elapsed_time(elapsed_ms: i64) -> String {
    let total_seconds = elapsed_ms.max(0) / 1000;
    let (hours, minutes, seconds) = (total_seconds / 3600, total_seconds / 60 % 60, total_seconds % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub fn trip_completion_message(is_green_trip: bool, carbon_kg: f64, green_points: i64) -> String {
    if is_green_trip {
        format!("🎉 Green trip completed! Carbon reduced {carbon_kg:.2} kg, earned {green_points} points")
    } else {
        format!("Trip completed, carbon emission {carbon_kg:.2} kg")
    }
}

pub fn navigation_info_text(remaining_meters: f64) -> (&'static str, String) {
    ("navigation", format!("Remaining: {:.2} km", remaining_meters / 1000.0))
}

pub fn tracking_info_text() -> (&'static str, &'static str) {
    ("tracking", "Recording GPS track in real time")
}

pub fn should_show_start_button(has_origin: bool, has_destination: bool) -> bool {
    has_origin && has_destination
}
