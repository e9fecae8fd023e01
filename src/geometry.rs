//! Pure distance and containment helpers over geographic coordinates
//!
//! Exact nearest-place queries are delegated to the external place-lookup
//! collaborator; these helpers only back the station distance diagnostics,
//! which carry no control-flow weight.

use crate::data::Point;

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (haversine)
pub fn distance_km(a: &Point, b: &Point) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Whether a point lies inside a polygon ring (ray casting)
///
/// The ring may be open or closed; a degenerate ring (< 3 vertices) contains
/// nothing. Points exactly on an edge are not guaranteed either way, which
/// is acceptable for diagnostics.
pub fn point_in_polygon(point: &Point, ring: &[Point]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);
        let crosses = (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Nearest ring vertex to a point, with its distance in kilometers
pub fn nearest_vertex(point: &Point, ring: &[Point]) -> Option<(Point, f64)> {
    ring.iter()
        .map(|vertex| (*vertex, distance_km(point, vertex)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(latitude: f64, longitude: f64) -> Point {
        Point {
            latitude,
            longitude,
        }
    }

    // Roughly a 1°×1° cell around Washington, DC
    fn dc_cell() -> Vec<Point> {
        vec![
            p(38.5, -77.5),
            p(38.5, -76.5),
            p(39.5, -76.5),
            p(39.5, -77.5),
        ]
    }

    #[test]
    fn test_distance_zero_for_identical_points() {
        let a = p(40.7128, -74.0060);
        assert!(distance_km(&a, &a) < 1e-9);
    }

    #[test]
    fn test_distance_new_york_to_los_angeles() {
        let nyc = p(40.7128, -74.0060);
        let lax = p(34.0522, -118.2437);
        let d = distance_km(&nyc, &lax);
        // Great-circle distance is about 3,936 km
        assert!((d - 3936.0).abs() < 30.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = p(38.9, -77.0);
        let b = p(39.2, -76.6);
        assert!((distance_km(&a, &b) - distance_km(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_point_in_polygon_inside() {
        assert!(point_in_polygon(&p(39.0, -77.0), &dc_cell()));
    }

    #[test]
    fn test_point_in_polygon_outside() {
        assert!(!point_in_polygon(&p(40.0, -77.0), &dc_cell()));
        assert!(!point_in_polygon(&p(39.0, -78.0), &dc_cell()));
    }

    #[test]
    fn test_point_in_polygon_degenerate_ring() {
        assert!(!point_in_polygon(&p(39.0, -77.0), &[]));
        assert!(!point_in_polygon(&p(39.0, -77.0), &[p(39.0, -77.0), p(39.1, -77.1)]));
    }

    #[test]
    fn test_nearest_vertex_picks_closest_corner() {
        let (vertex, distance) =
            nearest_vertex(&p(38.6, -77.4), &dc_cell()).expect("non-empty ring");
        assert!((vertex.latitude - 38.5).abs() < 1e-9);
        assert!((vertex.longitude - (-77.5)).abs() < 1e-9);
        assert!(distance > 0.0 && distance < 20.0);
    }

    #[test]
    fn test_nearest_vertex_empty_ring() {
        assert!(nearest_vertex(&p(38.6, -77.4), &[]).is_none());
    }
}
