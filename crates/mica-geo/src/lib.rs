//! Geodesic distance primitives over GeoJSON values stored as BSON
//! documents.
//!
//! Only what `$near` needs: point-to-point haversine distance and a coarse
//! within-radius test for Point, LineString and Polygon geometries. The
//! within-radius test checks every vertex (outer ring for polygons)
//! against the radius; it is an ordering aid, not exact geodesic geometry.

use bson::{Bson, Document};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Longitude/latitude of a GeoJSON Point document, if well formed.
fn point_coordinates(point: &Document) -> Option<(f64, f64)> {
    let coords = match point.get("coordinates") {
        Some(Bson::Array(a)) => a,
        _ => return None,
    };
    let lon = mica_ejson::as_f64(coords.first()?)?;
    let lat = mica_ejson::as_f64(coords.get(1)?)?;
    Some((lon, lat))
}

fn position_coordinates(position: &Bson) -> Option<(f64, f64)> {
    let arr = match position {
        Bson::Array(a) => a,
        _ => return None,
    };
    let lon = mica_ejson::as_f64(arr.first()?)?;
    let lat = mica_ejson::as_f64(arr.get(1)?)?;
    Some((lon, lat))
}

fn haversine((lon1, lat1): (f64, f64), (lon2, lat2): (f64, f64)) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Geodesic distance in meters between two GeoJSON Point documents.
///
/// Returns `None` when either point lacks a numeric coordinate pair.
pub fn point_distance(a: &Document, b: &Document) -> Option<f64> {
    Some(haversine(point_coordinates(a)?, point_coordinates(b)?))
}

/// Whether every vertex of `geometry` lies within `radius` meters of
/// `center` (a GeoJSON Point). Supports Point, LineString and Polygon
/// (outer ring); other geometry types are never within.
pub fn geometry_within_radius(geometry: &Document, center: &Document, radius: f64) -> bool {
    let center = match point_coordinates(center) {
        Some(c) => c,
        None => return false,
    };
    match geometry.get_str("type") {
        Ok("Point") => match point_coordinates(geometry) {
            Some(p) => haversine(p, center) <= radius,
            None => false,
        },
        Ok("LineString") => match geometry.get("coordinates") {
            Some(Bson::Array(points)) => vertices_within(points, center, radius),
            _ => false,
        },
        Ok("Polygon") => match geometry.get("coordinates") {
            Some(Bson::Array(rings)) => match rings.first() {
                Some(Bson::Array(outer)) => vertices_within(outer, center, radius),
                _ => false,
            },
            _ => false,
        },
        _ => false,
    }
}

fn vertices_within(points: &[Bson], center: (f64, f64), radius: f64) -> bool {
    if points.is_empty() {
        return false;
    }
    points.iter().all(|p| match position_coordinates(p) {
        Some(coords) => haversine(coords, center) <= radius,
        None => false,
    })
}
