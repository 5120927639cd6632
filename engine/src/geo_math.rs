use crate::models::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const DEFAULT_INTERPOLATION_STEPS: usize = 10;

/// Great-circle distance in kilometres (haversine).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lng - a.lng).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    distance_km(a, b) * 1000.0
}

/// `steps + 1` points linearly spaced in (lng, lat), both endpoints included.
pub fn interpolate(a: GeoPoint, b: GeoPoint, steps: usize) -> Vec<GeoPoint> {
    if steps == 0 {
        return vec![a];
    }
    (0..=steps)
        .map(|i| {
            if i == steps {
                b
            } else {
                a.interpolate(b, i as f64 / steps as f64)
            }
        })
        .collect()
}

pub fn interpolate_default(a: GeoPoint, b: GeoPoint) -> Vec<GeoPoint> {
    interpolate(a, b, DEFAULT_INTERPOLATION_STEPS)
}

pub fn route_length_km(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| distance_km(w[0], w[1])).sum()
}

pub fn route_length_m(points: &[GeoPoint]) -> f64 {
    route_length_km(points) * 1000.0
}
