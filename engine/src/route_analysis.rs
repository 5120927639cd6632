use serde::Serialize;

use crate::{
    fallback::partition_overview,
    models::{GeoPoint, RouteStep, TransportMode, TravelMode},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteAnalysis {
    pub has_transit_steps: bool,
    pub has_step_polylines: bool,
}

/// Frozen at the moment tracking starts; at most one of the two transit flags is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackingMode {
    pub is_navigation_mode: bool,
    pub has_transit_with_polylines: bool,
    pub has_transit_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Free tracking, nothing to draw ahead of the user.
    TrackOnly,
    SingleMode,
    StepPolylines,
    ProportionalFallback,
}

impl TrackingMode {
    pub fn strategy(&self) -> RenderStrategy {
        if !self.is_navigation_mode {
            RenderStrategy::TrackOnly
        } else if self.has_transit_with_polylines {
            RenderStrategy::StepPolylines
        } else if self.has_transit_fallback {
            RenderStrategy::ProportionalFallback
        } else {
            RenderStrategy::SingleMode
        }
    }
}

pub fn analyze_route(steps: Option<&[RouteStep]>) -> RouteAnalysis {
    let steps = steps.unwrap_or_default();
    RouteAnalysis {
        has_transit_steps: steps.iter().any(|s| s.travel_mode == TravelMode::Transit),
        has_step_polylines: steps.iter().any(RouteStep::has_polyline),
    }
}

pub fn determine_tracking_mode(route_points: &[GeoPoint], steps: Option<&[RouteStep]>) -> TrackingMode {
    if route_points.is_empty() {
        return TrackingMode::default();
    }
    let analysis = analyze_route(steps);
    TrackingMode {
        is_navigation_mode: true,
        has_transit_with_polylines: analysis.has_transit_steps && analysis.has_step_polylines,
        has_transit_fallback: analysis.has_transit_steps && !analysis.has_step_polylines,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentColor {
    Walking,
    Subway,
    Bus,
    Rail,
    Tram,
    Driving,
    Cycling,
    Remaining,
}

impl SegmentColor {
    pub fn for_step(step: &RouteStep) -> Self {
        let vehicle = step.transit_details.as_ref().map(|d| d.vehicle_type.as_str());
        Self::for_travel_mode(step.travel_mode, vehicle)
    }

    /// Unknown transit vehicles are drawn as buses.
    pub fn for_travel_mode(travel_mode: TravelMode, vehicle_type: Option<&str>) -> Self {
        match travel_mode {
            TravelMode::Walking => SegmentColor::Walking,
            TravelMode::Transit => match vehicle_type.map(str::to_uppercase).as_deref() {
                Some("SUBWAY" | "METRO_RAIL") => SegmentColor::Subway,
                Some("BUS" | "INTERCITY_BUS" | "TROLLEYBUS") => SegmentColor::Bus,
                Some(
                    "RAIL" | "HEAVY_RAIL" | "COMMUTER_TRAIN" | "HIGH_SPEED_TRAIN"
                    | "LONG_DISTANCE_TRAIN",
                ) => SegmentColor::Rail,
                Some("TRAM" | "MONORAIL") => SegmentColor::Tram,
                _ => SegmentColor::Bus,
            },
            TravelMode::Driving => SegmentColor::Driving,
            TravelMode::Bicycling => SegmentColor::Cycling,
            TravelMode::Other => SegmentColor::Remaining,
        }
    }

    pub fn for_transport_mode(mode: Option<TransportMode>) -> Self {
        match mode {
            Some(TransportMode::Walking) => SegmentColor::Walking,
            Some(TransportMode::Cycling) => SegmentColor::Cycling,
            Some(TransportMode::Bus) => SegmentColor::Bus,
            Some(TransportMode::Subway) => SegmentColor::Subway,
            _ => SegmentColor::Driving,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledSegment {
    pub step_index: Option<usize>,
    pub color: SegmentColor,
    pub width: f32,
    pub dashed: bool,
    pub points: Vec<GeoPoint>,
}

impl StyledSegment {
    fn for_step(step_index: usize, step: &RouteStep, points: Vec<GeoPoint>) -> Self {
        let walking = step.travel_mode == TravelMode::Walking;
        Self {
            step_index: Some(step_index),
            color: SegmentColor::for_step(step),
            width: if walking { 8.0 } else { 14.0 },
            dashed: walking,
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RenderPlan {
    Empty,
    SinglePolyline { segment: StyledSegment },
    StepPolylines { segments: Vec<StyledSegment> },
    ProportionalFallback { segments: Vec<StyledSegment> },
}

impl RenderPlan {
    pub fn segments(&self) -> &[StyledSegment] {
        match self {
            RenderPlan::Empty => &[],
            RenderPlan::SinglePolyline { segment } => std::slice::from_ref(segment),
            RenderPlan::StepPolylines { segments }
            | RenderPlan::ProportionalFallback { segments } => segments,
        }
    }
}

/// Picks the drawing strategy for a route and materialises its segments.
pub fn plan_route_rendering(
    route_points: &[GeoPoint],
    steps: Option<&[RouteStep]>,
    selected_mode: Option<TransportMode>,
) -> RenderPlan {
    let tracking_mode = determine_tracking_mode(route_points, steps);
    let steps = steps.unwrap_or_default();

    match tracking_mode.strategy() {
        RenderStrategy::TrackOnly => RenderPlan::Empty,
        RenderStrategy::SingleMode => single_polyline(route_points, selected_mode),
        RenderStrategy::StepPolylines => {
            let segments: Vec<_> = steps
                .iter()
                .enumerate()
                .filter_map(|(idx, step)| {
                    let points = step.polyline_points.as_ref()?;
                    (points.len() >= 2).then(|| StyledSegment::for_step(idx, step, points.clone()))
                })
                .collect();
            tracing::debug!("step polylines: {} of {} steps drawable", segments.len(), steps.len());
            RenderPlan::StepPolylines { segments }
        }
        RenderStrategy::ProportionalFallback => {
            let distances: Vec<f64> = steps.iter().map(|s| s.distance).collect();
            let Some(ranges) = partition_overview(route_points.len(), &distances) else {
                tracing::debug!(
                    "fallback allocation not applicable ({} points, {} steps), drawing overview",
                    route_points.len(),
                    steps.len()
                );
                return single_polyline(route_points, selected_mode);
            };
            let segments = ranges
                .into_iter()
                .zip(steps)
                .enumerate()
                .filter(|(_, (range, _))| range.len() >= 2)
                .map(|(idx, (range, step))| {
                    StyledSegment::for_step(idx, step, route_points[range].to_vec())
                })
                .collect();
            RenderPlan::ProportionalFallback { segments }
        }
    }
}

fn single_polyline(route_points: &[GeoPoint], selected_mode: Option<TransportMode>) -> RenderPlan {
    let walking = selected_mode == Some(TransportMode::Walking);
    RenderPlan::SinglePolyline {
        segment: StyledSegment {
            step_index: None,
            color: SegmentColor::for_transport_mode(selected_mode),
            width: if walking { 8.0 } else { 12.0 },
            dashed: walking,
            points: route_points.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransitDetails;

    fn point(i: usize) -> GeoPoint {
        GeoPoint::new(103.77 + i as f64 * 0.001, 1.29)
    }

    fn step(mode: TravelMode, distance: f64, polyline: Option<Vec<GeoPoint>>) -> RouteStep {
        RouteStep {
            instruction: "step".into(),
            distance,
            duration: 60,
            travel_mode: mode,
            transit_details: None,
            polyline_points: polyline,
        }
    }

    fn bus_step(distance: f64) -> RouteStep {
        RouteStep {
            transit_details: Some(TransitDetails {
                line_name: "D2".into(),
                line_short_name: None,
                departure_stop: "UTown".into(),
                arrival_stop: "COM3".into(),
                num_stops: 4,
                vehicle_type: "BUS".into(),
                headsign: None,
            }),
            ..step(TravelMode::Transit, distance, None)
        }
    }

    #[test]
    fn transit_step_with_polyline() {
        let steps = [step(TravelMode::Transit, 500.0, Some(vec![point(0), point(1)]))];
        assert_eq!(
            analyze_route(Some(&steps)),
            RouteAnalysis {
                has_transit_steps: true,
                has_step_polylines: true
            }
        );
    }

    #[test]
    fn missing_or_empty_steps_analyse_to_false() {
        assert_eq!(analyze_route(None), RouteAnalysis::default());
        assert_eq!(analyze_route(Some(&[])), RouteAnalysis::default());
        let steps = [step(TravelMode::Walking, 10.0, Some(Vec::new()))];
        assert!(!analyze_route(Some(&steps)).has_step_polylines);
    }

    #[test]
    fn no_route_points_means_no_navigation() {
        let steps = [bus_step(500.0)];
        assert_eq!(determine_tracking_mode(&[], Some(&steps)), TrackingMode::default());
    }

    #[test]
    fn transit_without_polylines_uses_fallback() {
        let steps = [step(TravelMode::Walking, 100.0, None), bus_step(900.0)];
        let mode = determine_tracking_mode(&[point(0), point(1)], Some(&steps));
        assert!(mode.is_navigation_mode);
        assert!(mode.has_transit_fallback);
        assert!(!mode.has_transit_with_polylines);
        assert_eq!(mode.strategy(), RenderStrategy::ProportionalFallback);
    }

    #[test]
    fn walking_route_is_single_mode() {
        let steps = [step(TravelMode::Walking, 100.0, Some(vec![point(0), point(1)]))];
        let mode = determine_tracking_mode(&[point(0), point(1)], Some(&steps));
        assert_eq!(mode.strategy(), RenderStrategy::SingleMode);
    }

    #[test]
    fn vehicle_colors() {
        assert_eq!(
            SegmentColor::for_travel_mode(TravelMode::Transit, Some("metro_rail")),
            SegmentColor::Subway
        );
        assert_eq!(
            SegmentColor::for_travel_mode(TravelMode::Transit, Some("FERRY")),
            SegmentColor::Bus
        );
        assert_eq!(
            SegmentColor::for_travel_mode(TravelMode::Transit, Some("COMMUTER_TRAIN")),
            SegmentColor::Rail
        );
        assert_eq!(
            SegmentColor::for_travel_mode(TravelMode::Other, None),
            SegmentColor::Remaining
        );
    }

    #[test]
    fn fallback_plan_splits_overview_by_distance() {
        let overview: Vec<GeoPoint> = (0..20).map(point).collect();
        let steps = [step(TravelMode::Walking, 250.0, None), bus_step(750.0)];
        let plan = plan_route_rendering(&overview, Some(&steps), None);

        let RenderPlan::ProportionalFallback { segments } = &plan else {
            panic!("expected fallback plan, got {plan:?}");
        };
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].points.len(), 5);
        assert!(segments[0].dashed);
        assert_eq!(segments[1].points.len(), 15);
        assert_eq!(segments[1].color, SegmentColor::Bus);
    }

    #[test]
    fn fallback_with_zero_distance_draws_overview() {
        let overview: Vec<GeoPoint> = (0..5).map(point).collect();
        let steps = [bus_step(0.0)];
        let plan = plan_route_rendering(&overview, Some(&steps), Some(TransportMode::Bus));
        assert!(matches!(plan, RenderPlan::SinglePolyline { .. }));
        assert_eq!(plan.segments()[0].points.len(), 5);
    }

    #[test]
    fn step_polylines_skip_short_steps() {
        let overview = vec![point(0), point(5)];
        let steps = [
            step(TravelMode::Walking, 50.0, Some(vec![point(0)])),
            RouteStep {
                polyline_points: Some(vec![point(1), point(2), point(3)]),
                ..bus_step(500.0)
            },
        ];
        let plan = plan_route_rendering(&overview, Some(&steps), None);
        let segments = plan.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].step_index, Some(1));
        assert_eq!(segments[0].width, 14.0);
    }

    #[test]
    fn single_walking_route_is_dashed() {
        let plan = plan_route_rendering(&[point(0), point(1)], None, Some(TransportMode::Walking));
        let segment = &plan.segments()[0];
        assert!(segment.dashed);
        assert_eq!(segment.width, 8.0);
        assert_eq!(plan_route_rendering(&[], None, None), RenderPlan::Empty);
    }
}
