use crate::{
    mode_segments::dominant_mode,
    models::{ModeSegment, TransportMode, TripCompletionData},
};

/// Emissions of the car trip every other mode is compared against (g CO2/km).
pub const DRIVING_BASELINE_G_PER_KM: f64 = 150.0;

/// Distance milestones in metres, ascending.
pub const DEFAULT_MILESTONES_M: [f64; 5] = [1_000.0, 2_000.0, 3_000.0, 5_000.0, 10_000.0];

const DEFAULT_USER_MODE: &str = "walk";
const GREEN_MODES: [&str; 4] = ["walk", "bike", "bus", "subway"];

/// g CO2 per kilometre. Unclassified travel is scored like a car.
pub fn emission_factor(mode: TransportMode) -> f64 {
    match mode {
        TransportMode::Walking | TransportMode::Cycling => 0.0,
        TransportMode::Bus => 50.0,
        TransportMode::Subway => 30.0,
        TransportMode::Driving | TransportMode::Unknown => DRIVING_BASELINE_G_PER_KM,
    }
}

pub fn emission_grams(distance_km: f64, mode: TransportMode) -> f64 {
    emission_factor(mode) * distance_km
}

/// Grams saved relative to driving the same distance, never negative.
pub fn saved_grams(distance_km: f64, mode: TransportMode) -> f64 {
    (DRIVING_BASELINE_G_PER_KM * distance_km - emission_grams(distance_km, mode)).max(0.0)
}

pub fn is_green_mode(mode: &str) -> bool {
    GREEN_MODES.contains(&mode)
}

/// Summary sent with a finished trip.
///
/// * `detected_mode` is the dominant classified mode, absent when the
///   classifier never produced a sample.
/// * `ml_confidence` is only reported alongside a detected mode and when it is
///   strictly positive, so the UI never shows "0% confident".
/// * `carbon_saved_grams` uses the mode the user selected; no selection saves nothing.
pub fn build_trip_completion(
    segments: &[ModeSegment],
    ml_confidence: f64,
    user_selected_mode: Option<&str>,
    distance_meters: f64,
    selected_mode: Option<TransportMode>,
) -> TripCompletionData {
    let detected_mode =
        (!segments.is_empty()).then(|| dominant_mode(segments).dict_value().to_string());
    let user_selected_mode = user_selected_mode.unwrap_or(DEFAULT_USER_MODE).to_string();
    let carbon_saved_grams = selected_mode
        .map(|mode| saved_grams(distance_meters / 1000.0, mode).round() as i64)
        .unwrap_or(0);
    let ml_confidence = (!segments.is_empty() && ml_confidence > 0.0).then_some(ml_confidence);

    TripCompletionData {
        detected_mode,
        is_green_trip: is_green_mode(&user_selected_mode),
        user_selected_mode,
        carbon_saved_grams,
        ml_confidence,
    }
}

/// Milestones already announced during the current session.
///
/// Only values that belong to the milestone sequence are ever recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReachedMilestones {
    values: Vec<f64>,
}

impl ReachedMilestones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the subset of `values` that appears in `milestones`.
    pub fn from_values(values: &[f64], milestones: &[f64]) -> Self {
        let mut reached = Self::new();
        for value in values {
            reached.mark(*value, milestones);
        }
        reached
    }

    pub fn contains(&self, milestone: f64) -> bool {
        self.values.contains(&milestone)
    }

    /// Returns `false` when the value is not a milestone or was already reached.
    pub fn mark(&mut self, milestone: f64, milestones: &[f64]) -> bool {
        if !milestones.contains(&milestone) || self.contains(milestone) {
            return false;
        }
        self.values.push(milestone);
        true
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

/// Smallest milestone that `distance_meters` has reached and that has not been
/// announced yet. Does not record anything; see [`MilestoneTracker::advance`].
pub fn check_milestone(distance_meters: f64, milestones: &[f64], reached: &ReachedMilestones) -> Option<f64> {
    milestones
        .iter()
        .copied()
        .filter(|m| distance_meters >= *m && !reached.contains(*m))
        .min_by(f64::total_cmp)
}

/// Milestone sequence paired with the session's reached set.
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    milestones: Vec<f64>,
    reached: ReachedMilestones,
}

impl MilestoneTracker {
    pub fn new(milestones: Vec<f64>) -> Self {
        Self {
            milestones,
            reached: ReachedMilestones::new(),
        }
    }

    /// Checks `distance_meters` and records the milestone it reached, if any.
    pub fn advance(&mut self, distance_meters: f64) -> Option<f64> {
        let milestone = check_milestone(distance_meters, &self.milestones, &self.reached)?;
        self.reached.mark(milestone, &self.milestones);
        Some(milestone)
    }

    pub fn reset(&mut self) {
        self.reached.clear();
    }

    pub fn milestones(&self) -> &[f64] {
        &self.milestones
    }

    pub fn reached(&self) -> &ReachedMilestones {
        &self.reached
    }
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MILESTONES_M.to_vec())
    }
}

/// Five stars for a zero-emission route, one star above 0.10 kg/km.
pub fn eco_rating_stars(total_carbon_kg: f64, distance_km: f64) -> u8 {
    let carbon_per_km = if distance_km > 0.0 {
        total_carbon_kg / distance_km
    } else {
        total_carbon_kg
    };

    match carbon_per_km {
        c if c == 0.0 => 5,
        c if c < 0.03 => 4,
        c if c < 0.06 => 3,
        c if c < 0.10 => 2,
        _ => 1,
    }
}

pub fn carbon_color_hex(total_carbon_kg: f64) -> &'static str {
    match total_carbon_kg {
        c if c == 0.0 => "#4CAF50",
        c if c < 0.5 => "#8BC34A",
        c if c < 1.5 => "#FFC107",
        _ => "#FF5722",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(mode: TransportMode, start: i64, end: i64) -> ModeSegment {
        ModeSegment {
            mode,
            start_time_ms: start,
            end_time_ms: end,
        }
    }

    #[test]
    fn emission_factors() {
        assert_eq!(emission_grams(2.0, TransportMode::Bus), 100.0);
        assert_eq!(emission_grams(2.0, TransportMode::Subway), 60.0);
        assert_eq!(emission_grams(2.0, TransportMode::Cycling), 0.0);
    }

    #[test]
    fn driving_saves_nothing() {
        assert_eq!(saved_grams(12.5, TransportMode::Driving), 0.0);
        assert_eq!(saved_grams(12.5, TransportMode::Unknown), 0.0);
    }

    #[test]
    fn green_modes() {
        for mode in ["walk", "bike", "bus", "subway"] {
            assert!(is_green_mode(mode), "{mode} should be green");
        }
        assert!(!is_green_mode("car"));
        assert!(!is_green_mode("hoverboard"));
        assert!(!is_green_mode(""));
    }

    #[test]
    fn completion_without_segments() {
        let data = build_trip_completion(&[], 0.9, None, 1_000.0, Some(TransportMode::Walking));
        assert_eq!(
            data,
            TripCompletionData {
                detected_mode: None,
                user_selected_mode: "walk".into(),
                is_green_trip: true,
                carbon_saved_grams: 150,
                ml_confidence: None,
            }
        );
    }

    #[test]
    fn completion_with_segments_reports_dominant_mode() {
        let segments = [
            seg(TransportMode::Walking, 0, 60_000),
            seg(TransportMode::Bus, 60_000, 600_000),
        ];
        let data = build_trip_completion(&segments, 0.82, Some("bus"), 4_200.0, Some(TransportMode::Bus));
        assert_eq!(data.detected_mode.as_deref(), Some("bus"));
        assert_eq!(data.ml_confidence, Some(0.82));
        assert!(data.is_green_trip);
        assert_eq!(data.carbon_saved_grams, 420);
    }

    #[test]
    fn completion_hides_zero_confidence_and_car_savings() {
        let segments = [seg(TransportMode::Driving, 0, 1_000)];
        let data = build_trip_completion(&segments, 0.0, Some("car"), 5_000.0, Some(TransportMode::Driving));
        assert_eq!(data.ml_confidence, None);
        assert!(!data.is_green_trip);
        assert_eq!(data.carbon_saved_grams, 0);

        let unselected = build_trip_completion(&segments, 0.5, None, 5_000.0, None);
        assert_eq!(unselected.carbon_saved_grams, 0);
    }

    #[test]
    fn carbon_saved_is_rounded() {
        // 1.2345 km walked saves 185.175 g
        let data = build_trip_completion(&[], 0.0, None, 1_234.5, Some(TransportMode::Walking));
        assert_eq!(data.carbon_saved_grams, 185);
    }

    #[test]
    fn milestone_query_then_mark() {
        let milestones = [1_000.0, 2_000.0, 3_000.0];
        let mut reached = ReachedMilestones::new();
        assert_eq!(check_milestone(1_500.0, &milestones, &reached), Some(1_000.0));
        assert!(reached.mark(1_000.0, &milestones));
        assert_eq!(check_milestone(1_500.0, &milestones, &reached), None);
    }

    #[test]
    fn milestone_returns_smallest_unreached() {
        let reached = ReachedMilestones::new();
        assert_eq!(check_milestone(3_200.0, &DEFAULT_MILESTONES_M, &reached), Some(1_000.0));
        assert_eq!(check_milestone(999.9, &DEFAULT_MILESTONES_M, &reached), None);
    }

    #[test]
    fn reached_set_rejects_foreign_values() {
        let mut reached = ReachedMilestones::from_values(&[1_000.0, 1_500.0], &DEFAULT_MILESTONES_M);
        assert_eq!(reached.len(), 1);
        assert!(!reached.mark(1_000.0, &DEFAULT_MILESTONES_M));
        assert!(!reached.mark(42.0, &DEFAULT_MILESTONES_M));
    }

    #[test]
    fn tracker_announces_each_milestone_once() {
        let mut tracker = MilestoneTracker::default();
        assert_eq!(tracker.advance(2_500.0), Some(1_000.0));
        assert_eq!(tracker.advance(2_500.0), Some(2_000.0));
        assert_eq!(tracker.advance(2_500.0), None);
        tracker.reset();
        assert!(tracker.reached().is_empty());
        assert_eq!(tracker.advance(1_000.0), Some(1_000.0));
    }

    #[test]
    fn eco_rating_thresholds() {
        assert_eq!(eco_rating_stars(0.0, 3.0), 5);
        assert_eq!(eco_rating_stars(0.06, 3.0), 4);
        assert_eq!(eco_rating_stars(0.15, 3.0), 3);
        assert_eq!(eco_rating_stars(0.27, 3.0), 2);
        assert_eq!(eco_rating_stars(0.45, 3.0), 1);
        assert_eq!(carbon_color_hex(0.0), "#4CAF50");
        assert_eq!(carbon_color_hex(2.0), "#FF5722");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_savings_ordering(distance in 0.001f64..1_000.0) {
                let walk = saved_grams(distance, TransportMode::Walking);
                let bike = saved_grams(distance, TransportMode::Cycling);
                let subway = saved_grams(distance, TransportMode::Subway);
                let bus = saved_grams(distance, TransportMode::Bus);
                let car = saved_grams(distance, TransportMode::Driving);
                prop_assert_eq!(walk, bike);
                prop_assert!(bike > subway);
                prop_assert!(subway > bus);
                prop_assert!(bus > car);
                prop_assert_eq!(car, 0.0);
            }

            #[test]
            fn prop_milestone_check_is_idempotent(
                distance in 0.0f64..20_000.0,
                reached_count in 0usize..5
            ) {
                let reached = ReachedMilestones::from_values(
                    &DEFAULT_MILESTONES_M[..reached_count],
                    &DEFAULT_MILESTONES_M,
                );
                let first = check_milestone(distance, &DEFAULT_MILESTONES_M, &reached);
                let second = check_milestone(distance, &DEFAULT_MILESTONES_M, &reached);
                prop_assert_eq!(first, second);
                if let Some(m) = first {
                    prop_assert!(distance >= m);
                    prop_assert!(!reached.contains(m));
                }
            }
        }
    }
}
