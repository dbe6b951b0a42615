pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two `(lon, lat)` points on a
/// spherical Earth.
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokyo_to_shibuya() {
        let d = haversine_km(139.7671, 35.6812, 139.7454, 35.6586);
        assert!((d - 3.5).abs() < 0.5, "got {d}");
    }

    #[test]
    fn test_zero_for_same_point() {
        assert!(haversine_km(139.7671, 35.6812, 139.7671, 35.6812).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric() {
        let a = haversine_km(135.5023, 34.6937, 141.3544, 43.0621);
        let b = haversine_km(141.3544, 43.0621, 135.5023, 34.6937);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_quarter_meridian() {
        let d = haversine_km(0.0, 0.0, 0.0, 90.0);
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
