//! Great-circle distance helpers. Road-network routing is out of scope;
//! haversine is the approximation used everywhere.

use crate::models::Location;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

pub fn distance_km(a: &Location, b: &Location) -> f64 {
    haversine_distance_km(a.lat, a.lng, b.lat, b.lng)
}

pub fn within_radius(a: &Location, b: &Location, radius_km: f64) -> bool {
    a.has_valid_coordinates() && b.has_valid_coordinates() && distance_km(a, b) <= radius_km
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lng: f64) -> Location {
        Location {
            address: "test".into(),
            lat,
            lng,
        }
    }

    #[test]
    fn test_zero_distance() {
        let p = loc(52.52, 13.405);
        assert!(distance_km(&p, &p) < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // 0.018 degrees of latitude is very close to 2 km
        let a = loc(52.0, 13.0);
        let b = loc(52.018, 13.0);
        let d = distance_km(&a, &b);
        assert!((d - 2.0).abs() < 0.01, "expected ~2 km, got {d}");
    }

    #[test]
    fn test_within_radius() {
        let a = loc(52.0, 13.0);
        let b = loc(52.018, 13.0);
        assert!(within_radius(&a, &b, 2.1));
        assert!(!within_radius(&a, &b, 1.9));
    }

    #[test]
    fn test_invalid_coordinates_never_within_radius() {
        let a = loc(f64::NAN, 13.0);
        let b = loc(52.0, 13.0);
        assert!(!within_radius(&a, &b, 1_000_000.0));
    }
}
