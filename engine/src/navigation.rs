//! Progress of the user along a planned route.
//!
//! Matching only looks a short window ahead of the current index and never
//! moves backwards, so a route that loops back over itself is followed in order.

use serde::Serialize;

use crate::{
    geo_math::{distance_m, route_length_m},
    models::GeoPoint,
};

/// Farther than this from every candidate point counts as off route (metres).
pub const ROUTE_MATCH_THRESHOLD_M: f64 = 50.0;

/// Route points examined ahead of the current index.
const SEARCH_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub index: usize,
    pub distance_to_route_m: f64,
    pub on_route: bool,
    pub traveled_m: f64,
    pub remaining_m: f64,
}

#[derive(Debug, Clone)]
pub struct RouteProgress {
    route: Vec<GeoPoint>,
    index: usize,
    traveled_m: f64,
    remaining_m: f64,
}

impl RouteProgress {
    pub fn new(route: Vec<GeoPoint>) -> Self {
        let remaining_m = route_length_m(&route);
        Self {
            route,
            index: 0,
            traveled_m: 0.0,
            remaining_m,
        }
    }

    pub fn route(&self) -> &[GeoPoint] {
        &self.route
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn traveled_m(&self) -> f64 {
        self.traveled_m
    }

    pub fn remaining_m(&self) -> f64 {
        self.remaining_m
    }

    /// Route points up to and including the current one.
    pub fn traveled_points(&self) -> &[GeoPoint] {
        self.route.get(..=self.index).unwrap_or(&[])
    }

    /// Matches a GPS fix against the route. `None` for an empty route.
    pub fn update(&mut self, location: GeoPoint) -> Option<ProgressUpdate> {
        let (nearest, distance_to_route_m) = self.nearest_ahead(location)?;

        // nearest_ahead never returns an index behind the current one
        self.index = nearest;
        self.traveled_m = route_length_m(&self.route[..=nearest]);
        self.remaining_m = match self.route.get(nearest + 1..) {
            Some(rest) if !rest.is_empty() => {
                distance_m(location, rest[0]) + route_length_m(rest)
            }
            _ => 0.0,
        };

        Some(ProgressUpdate {
            index: self.index,
            distance_to_route_m,
            on_route: distance_to_route_m < ROUTE_MATCH_THRESHOLD_M,
            traveled_m: self.traveled_m,
            remaining_m: self.remaining_m,
        })
    }

    fn nearest_ahead(&self, location: GeoPoint) -> Option<(usize, f64)> {
        let end = (self.index + SEARCH_WINDOW).min(self.route.len());
        self.route
            .get(self.index..end)?
            .iter()
            .enumerate()
            .map(|(offset, point)| (self.index + offset, distance_m(location, *point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Share of route points passed, 0 to 100.
    pub fn progress_percent(&self) -> f64 {
        if self.route.is_empty() {
            return 0.0;
        }
        self.index as f64 / self.route.len() as f64 * 100.0
    }

    pub fn has_reached_destination(&self) -> bool {
        !self.route.is_empty() && self.index >= self.route.len() - 1
    }
}
