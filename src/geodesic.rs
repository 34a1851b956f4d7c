use crate::models::Coordinate;

/// Spherical Earth radius in meters. Position math everywhere in this
/// crate must use this exact constant so distances stay consistent with
/// previously persisted routes.
pub const EARTH_RADIUS_M: f64 = 6_372_797.6;

/// Great-circle distance between two coordinates, in meters.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `from` toward `to`, in degrees within [0, 360).
pub fn bearing_degrees(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Projects a new coordinate `distance_meters` along the great circle
/// that leaves `from` at the given initial bearing.
pub fn destination(from: Coordinate, bearing_degrees: f64, distance_meters: f64) -> Coordinate {
    let bearing = bearing_degrees.to_radians();
    let angular = distance_meters / EARTH_RADIUS_M;

    let lat1 = from.lat.to_radians();
    let lon1 = from.lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate {
        lat: lat2.to_degrees(),
        lon: wrap_longitude(lon2.to_degrees()),
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(left: f64, right: f64, tolerance: f64) {
        assert!(
            (left - right).abs() <= tolerance,
            "expected {left} ~= {right} within {tolerance}"
        );
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        let point = Coordinate { lat: 45.0, lon: 5.0 };
        assert_eq!(distance_meters(point, point), 0.0);
    }

    #[test]
    fn test_distance_one_degree_of_longitude_at_equator() {
        let a = Coordinate { lat: 0.0, lon: 0.0 };
        let b = Coordinate { lat: 0.0, lon: 1.0 };
        let expected = 2.0 * std::f64::consts::PI * EARTH_RADIUS_M / 360.0;
        assert_close(distance_meters(a, b), expected, 1e-6);
    }

    #[test]
    fn test_bearing_due_east_at_equator() {
        let a = Coordinate { lat: 0.0, lon: 0.0 };
        let b = Coordinate { lat: 0.0, lon: 1.0 };
        assert_close(bearing_degrees(a, b), 90.0, 1e-9);
    }

    #[test]
    fn test_bearing_due_north() {
        let a = Coordinate { lat: 10.0, lon: 20.0 };
        let b = Coordinate { lat: 11.0, lon: 20.0 };
        assert_close(bearing_degrees(a, b), 0.0, 1e-9);
    }

    #[test]
    fn test_destination_due_east_moves_longitude_only() {
        let start = Coordinate { lat: 0.0, lon: 0.0 };
        let step = destination(start, 90.0, 1000.0);
        assert_close(step.lat, 0.0, 1e-9);
        assert!(step.lon > 0.0);
    }

    #[test]
    fn test_destination_wraps_antimeridian() {
        let start = Coordinate {
            lat: 0.0,
            lon: 179.9999,
        };
        let step = destination(start, 90.0, 100_000.0);
        assert!(step.lon < 0.0, "longitude should wrap, got {}", step.lon);
        assert!(step.lon >= -180.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-89.0..=89.0, -180.0..=180.0).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_distance_symmetric(a in valid_coord(), b in valid_coord()) {
                let ab = distance_meters(a, b);
                let ba = distance_meters(b, a);
                prop_assert!((ab - ba).abs() < 1e-6);
            }

            #[test]
            fn prop_distance_non_negative(a in valid_coord(), b in valid_coord()) {
                prop_assert!(distance_meters(a, b) >= 0.0);
            }

            #[test]
            fn prop_bearing_in_range(a in valid_coord(), b in valid_coord()) {
                let bearing = bearing_degrees(a, b);
                prop_assert!((0.0..360.0).contains(&bearing));
            }

            #[test]
            fn prop_destination_inverts_bearing_and_distance(
                a in valid_coord(),
                b in valid_coord(),
            ) {
                let distance = distance_meters(a, b);
                // Skip near-antipodal pairs where the great circle is ill-conditioned.
                prop_assume!(distance < std::f64::consts::PI * EARTH_RADIUS_M * 0.95);
                let projected = destination(a, bearing_degrees(a, b), distance);
                prop_assert!(distance_meters(projected, b) < 1.0);
            }

            #[test]
            fn prop_destination_travels_requested_distance(
                a in valid_coord(),
                bearing in 0.0..360.0_f64,
                distance in 0.0..1_000_000.0_f64,
            ) {
                let projected = destination(a, bearing, distance);
                prop_assert!((distance_meters(a, projected) - distance).abs() < 1.0);
            }
        }
    }
}
