use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::{
    error::TripError,
    models::{GeoPoint, RoutePreference, RouteQuery, RouteRecommendData, TransportMode},
    route_analysis::{RouteAnalysis, analyze_route},
    service::TripService,
};

#[derive(Debug, Clone, Serialize)]
pub struct PlannedRoute {
    pub data: RouteRecommendData,
    pub points: Vec<GeoPoint>,
    pub analysis: RouteAnalysis,
    pub message: String,
}

/// Fetches route recommendations for the user from the trip service.
pub struct RoutePlanner {
    service: Arc<dyn TripService>,
    user_id: String,
}

impl RoutePlanner {
    pub fn new(service: Arc<dyn TripService>, user_id: impl Into<String>) -> Self {
        Self {
            service,
            user_id: user_id.into(),
        }
    }

    /// Origin defaults to the current location; both checks run before any request.
    pub async fn plan(&self, query: &RouteQuery) -> Result<PlannedRoute, TripError> {
        let start = query
            .origin
            .or(query.current_location)
            .ok_or(TripError::MissingOrigin)?;
        let end = query.destination.ok_or(TripError::MissingDestination)?;

        let data = match query.preference {
            RoutePreference::LowCarbon => {
                self.service
                    .get_lowest_carbon_route(&self.user_id, start, end)
                    .await?
            }
            RoutePreference::Balanced => {
                self.service
                    .get_balanced_route(&self.user_id, start, end)
                    .await?
            }
            RoutePreference::ByMode => {
                let mode = query.mode.unwrap_or(TransportMode::Walking);
                self.service
                    .get_route_by_mode(&self.user_id, start, end, mode)
                    .await?
            }
        };

        let message = success_message(query, &data);
        info!("{message}");
        Ok(PlannedRoute {
            points: data.display_points(),
            analysis: analyze_route(data.route_steps.as_deref()),
            data,
            message,
        })
    }
}

fn success_message(query: &RouteQuery, data: &RouteRecommendData) -> String {
    match query.preference {
        RoutePreference::LowCarbon => format!(
            "Low carbon route found, estimated saving {:.2} kg CO₂",
            data.carbon_saved
        ),
        RoutePreference::Balanced => format!(
            "Balanced route found, estimated saving {:.2} kg CO₂",
            data.carbon_saved
        ),
        RoutePreference::ByMode => format!(
            "{} route: {:.2} km, est. {} min, carbon saved {:.2} kg",
            query.mode.unwrap_or(TransportMode::Walking).display_name(),
            data.total_distance,
            data.estimated_duration,
            data.carbon_saved
        ),
    }
}
