use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    carbon::{DRIVING_BASELINE_G_PER_KM, emission_factor, saved_grams},
    error::ServiceError,
    geo_math::{interpolate_default, route_length_km},
    models::{
        CarbonCalculateData, GeoPoint, LocationInfo, RouteAlternative, RouteRecommendData,
        RouteStep, TransportMode, TravelMode, TripCancelData, TripSaveData, TripTrackData,
    },
};

/// Remote collaborator that owns trip records and route recommendations.
///
/// Implementations must be shareable across tasks; the lifecycle holds one
/// behind an `Arc` and never keeps a lock while awaiting it.
#[async_trait]
pub trait TripService: Send + Sync {
    async fn start_trip_tracking(
        &self,
        user_id: &str,
        origin: GeoPoint,
        location: Option<LocationInfo>,
    ) -> Result<TripTrackData, ServiceError>;

    async fn cancel_trip_tracking(
        &self,
        trip_id: &str,
        user_id: &str,
        reason: Option<String>,
    ) -> Result<TripCancelData, ServiceError>;

    async fn save_trip(
        &self,
        trip_id: &str,
        user_id: &str,
        end_point: GeoPoint,
        end_location: Option<LocationInfo>,
        distance_km: f64,
        end_time: String,
    ) -> Result<TripSaveData, ServiceError>;

    async fn calculate_carbon(
        &self,
        trip_id: &str,
        modes_used: Vec<String>,
    ) -> Result<CarbonCalculateData, ServiceError>;

    async fn get_route_by_mode(
        &self,
        user_id: &str,
        start: GeoPoint,
        end: GeoPoint,
        mode: TransportMode,
    ) -> Result<RouteRecommendData, ServiceError>;

    async fn get_lowest_carbon_route(
        &self,
        user_id: &str,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RouteRecommendData, ServiceError>;

    async fn get_balanced_route(
        &self,
        user_id: &str,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RouteRecommendData, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StartTrip,
    CancelTrip,
    SaveTrip,
    CalculateCarbon,
    RecommendRoute,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::StartTrip => "start_trip_tracking",
            Operation::CancelTrip => "cancel_trip_tracking",
            Operation::SaveTrip => "save_trip",
            Operation::CalculateCarbon => "calculate_carbon",
            Operation::RecommendRoute => "recommend_route",
        }
    }
}

/// Carbon tables used by the in-process service, in g CO2/km. Modes the
/// backend does not know are charged 100 g/km.
fn mock_factor(mode: &str) -> f64 {
    match mode {
        "walk" | "bike" => 0.0,
        "bus" => 50.0,
        "subway" => 30.0,
        "car" => 150.0,
        _ => 100.0,
    }
}

/// Every mock trip is assumed to cover this distance when scoring carbon.
const MOCK_TRIP_DISTANCE_KM: f64 = 5.0;

/// In-process stand-in for the trip backend.
///
/// Each call sleeps for the configured latency. Individual operations can be
/// made to fail to exercise the error paths of the lifecycle.
#[derive(Debug, Default)]
pub struct MockTripService {
    latency: Duration,
    trip_counter: AtomicU64,
    route_counter: AtomicU64,
    failures: Mutex<HashMap<Operation, String>>,
    calls: Mutex<Vec<Operation>>,
}

impl MockTripService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn shared(latency: Duration) -> Arc<Self> {
        Arc::new(Self::with_latency(latency))
    }

    /// Makes every subsequent call of `operation` fail with `message`.
    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(operation, message.into());
        }
    }

    pub fn recover(&self, operation: Operation) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(&operation);
        }
    }

    /// Operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls().into_iter().filter(|op| *op == operation).count()
    }

    async fn enter(&self, operation: Operation) -> Result<(), ServiceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let failure = self
            .failures
            .lock()
            .ok()
            .and_then(|failures| failures.get(&operation).cloned());
        match failure {
            Some(message) => Err(ServiceError::Rejected {
                operation: operation.name(),
                message,
            }),
            None => Ok(()),
        }
    }

    fn next_trip_id(&self) -> String {
        let n = self.trip_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("MOCK_TRIP_{n}")
    }

    fn mock_route(&self, start: GeoPoint, end: GeoPoint, mode: TransportMode, route_type: &str) -> RouteRecommendData {
        let points = interpolate_default(start, end);
        let distance_km = route_length_km(&points);
        let speed_kmh = match mode {
            TransportMode::Walking | TransportMode::Unknown => 5.0,
            TransportMode::Cycling => 15.0,
            TransportMode::Bus => 20.0,
            TransportMode::Subway => 30.0,
            TransportMode::Driving => 40.0,
        };
        let duration_min = ((distance_km / speed_kmh) * 60.0).ceil() as i64;
        let travel_mode = match mode {
            TransportMode::Walking | TransportMode::Unknown => TravelMode::Walking,
            TransportMode::Cycling => TravelMode::Bicycling,
            TransportMode::Bus | TransportMode::Subway => TravelMode::Transit,
            TransportMode::Driving => TravelMode::Driving,
        };
        let step = RouteStep {
            instruction: format!("Head to destination by {}", mode.display_name().to_lowercase()),
            distance: distance_km * 1000.0,
            duration: duration_min * 60,
            travel_mode,
            transit_details: None,
            polyline_points: Some(points.clone()),
        };
        let total_carbon = emission_factor(mode) * distance_km / 1000.0;
        let carbon_saved = saved_grams(distance_km, mode) / 1000.0;

        RouteRecommendData {
            route_id: Some(format!("MOCK_ROUTE_{}", self.route_counter.fetch_add(1, Ordering::Relaxed) + 1)),
            route_type: Some(route_type.to_string()),
            total_distance: distance_km,
            estimated_duration: duration_min,
            total_carbon,
            carbon_saved,
            route_alternatives: Some(vec![RouteAlternative {
                index: 0,
                total_distance: distance_km,
                estimated_duration: duration_min,
                total_carbon,
                route_points: points.clone(),
                route_steps: vec![step.clone()],
                summary: format!("{} route", mode.display_name()),
            }]),
            route_points: Some(points),
            route_steps: Some(vec![step]),
            green_route: None,
            duration: Some(duration_min),
        }
    }
}

#[async_trait]
impl TripService for MockTripService {
    async fn start_trip_tracking(
        &self,
        user_id: &str,
        origin: GeoPoint,
        _location: Option<LocationInfo>,
    ) -> Result<TripTrackData, ServiceError> {
        self.enter(Operation::StartTrip).await?;
        let trip_id = self.next_trip_id();
        info!("mock trip {trip_id} started for {user_id} at ({}, {})", origin.lng, origin.lat);
        Ok(TripTrackData {
            trip_id,
            start_time: Utc::now().to_rfc3339(),
            status: "tracking".to_string(),
        })
    }

    async fn cancel_trip_tracking(
        &self,
        trip_id: &str,
        _user_id: &str,
        reason: Option<String>,
    ) -> Result<TripCancelData, ServiceError> {
        self.enter(Operation::CancelTrip).await?;
        debug!("mock trip {trip_id} canceled: {}", reason.as_deref().unwrap_or("no reason"));
        Ok(TripCancelData {
            trip_id: trip_id.to_string(),
            cancel_time: Some(Utc::now().to_rfc3339()),
            status: "canceled".to_string(),
        })
    }

    async fn save_trip(
        &self,
        trip_id: &str,
        _user_id: &str,
        _end_point: GeoPoint,
        _end_location: Option<LocationInfo>,
        distance_km: f64,
        _end_time: String,
    ) -> Result<TripSaveData, ServiceError> {
        self.enter(Operation::SaveTrip).await?;
        Ok(TripSaveData {
            trip_id: trip_id.to_string(),
            total_distance: Some(distance_km),
            duration_minutes: None,
            status: "completed".to_string(),
        })
    }

    async fn calculate_carbon(
        &self,
        _trip_id: &str,
        modes_used: Vec<String>,
    ) -> Result<CarbonCalculateData, ServiceError> {
        self.enter(Operation::CalculateCarbon).await?;
        if modes_used.is_empty() {
            return Ok(CarbonCalculateData {
                total_carbon_emission: 0.0,
                carbon_saved: 0.0,
                green_points: 0,
                transport_breakdown: HashMap::new(),
            });
        }

        let share_km = MOCK_TRIP_DISTANCE_KM / modes_used.len() as f64;
        let mut transport_breakdown = HashMap::new();
        let mut total_g = 0.0;
        for mode in &modes_used {
            let grams = mock_factor(mode) * share_km;
            total_g += grams;
            *transport_breakdown.entry(mode.clone()).or_insert(0.0) += grams / 1000.0;
        }
        let saved_g = (DRIVING_BASELINE_G_PER_KM * MOCK_TRIP_DISTANCE_KM - total_g).max(0.0);

        Ok(CarbonCalculateData {
            total_carbon_emission: total_g / 1000.0,
            carbon_saved: saved_g / 1000.0,
            green_points: (saved_g / 10.0) as i64,
            transport_breakdown,
        })
    }

    async fn get_route_by_mode(
        &self,
        _user_id: &str,
        start: GeoPoint,
        end: GeoPoint,
        mode: TransportMode,
    ) -> Result<RouteRecommendData, ServiceError> {
        self.enter(Operation::RecommendRoute).await?;
        Ok(self.mock_route(start, end, mode, mode.dict_value()))
    }

    async fn get_lowest_carbon_route(
        &self,
        _user_id: &str,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RouteRecommendData, ServiceError> {
        self.enter(Operation::RecommendRoute).await?;
        Ok(self.mock_route(start, end, TransportMode::Walking, "low_carbon"))
    }

    async fn get_balanced_route(
        &self,
        _user_id: &str,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RouteRecommendData, ServiceError> {
        self.enter(Operation::RecommendRoute).await?;
        Ok(self.mock_route(start, end, TransportMode::Bus, "balanced"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campus() -> (GeoPoint, GeoPoint) {
        (GeoPoint::new(103.7764, 1.2966), GeoPoint::new(103.7810, 1.2990))
    }

    #[tokio::test]
    async fn trip_ids_are_sequential() {
        let service = MockTripService::new();
        let (origin, _) = campus();
        let first = service.start_trip_tracking("u", origin, None).await.unwrap();
        let second = service.start_trip_tracking("u", origin, None).await.unwrap();
        assert_eq!(first.trip_id, "MOCK_TRIP_1");
        assert_eq!(second.trip_id, "MOCK_TRIP_2");
        assert_eq!(first.status, "tracking");
    }

    #[tokio::test]
    async fn injected_failure_is_reported_until_recovered() {
        let service = MockTripService::new();
        service.fail(Operation::SaveTrip, "disk full");
        let (_, end) = campus();
        let err = service
            .save_trip("t", "u", end, None, 1.0, String::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Rejected {
                operation: "save_trip",
                message: "disk full".into()
            }
        );
        service.recover(Operation::SaveTrip);
        assert!(service.save_trip("t", "u", end, None, 1.0, String::new()).await.is_ok());
        assert_eq!(service.call_count(Operation::SaveTrip), 2);
    }

    #[tokio::test]
    async fn carbon_uses_fixed_distance_and_backend_factors() {
        let service = MockTripService::new();
        let data = service
            .calculate_carbon("t", vec!["walk".into(), "bus".into()])
            .await
            .unwrap();
        // 2.5 km walking + 2.5 km by bus at 50 g/km
        assert!((data.total_carbon_emission - 0.125).abs() < 1e-9);
        assert!((data.carbon_saved - 0.625).abs() < 1e-9);
        assert_eq!(data.green_points, 62);

        let unknown = service.calculate_carbon("t", vec!["hoverboard".into()]).await.unwrap();
        assert!((unknown.total_carbon_emission - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn routes_follow_the_requested_mode() {
        let service = MockTripService::new();
        let (start, end) = campus();
        let route = service
            .get_route_by_mode("u", start, end, TransportMode::Cycling)
            .await
            .unwrap();
        assert_eq!(route.route_type.as_deref(), Some("bike"));
        assert_eq!(route.route_points.as_ref().map(Vec::len), Some(11));
        assert_eq!(route.total_carbon, 0.0);

        let balanced = service.get_balanced_route("u", start, end).await.unwrap();
        assert!(balanced.total_carbon > 0.0);
        let steps = balanced.route_steps.unwrap();
        assert_eq!(steps[0].travel_mode, TravelMode::Transit);
    }
}
