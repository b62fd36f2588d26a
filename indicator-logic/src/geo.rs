//! Great-circle helpers. Bearings are degrees clockwise from true north.

use crate::location::GeoPoint;

/// Mean earth radius used by every distance in the crate
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Wrap any angle into `[0, 360)`
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Haversine distance between two points in meters
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_long = (b.long - a.long).to_radians();

    let s_lat = (d_lat / 2.0).sin();
    let s_long = (d_long / 2.0).sin();
    let h = (s_lat * s_lat + lat1.cos() * lat2.cos() * s_long * s_long).clamp(0.0, 1.0);

    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing on the great circle from `from` to `to`, in `[0, 360)`.
/// Returns 0 when both points are the same.
pub fn bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_long = (to.long - from.long).to_radians();

    let y = d_long.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_long.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Shortest signed rotation from `b1` to `b2` in `(-180, 180]`, positive is clockwise
pub fn signed_angle_diff(b1: f64, b2: f64) -> f64 {
    let diff = normalize_degrees(b2 - b1);
    if diff > 180.0 { diff - 360.0 } else { diff }
}

/// Unsigned separation between a heading and a bearing in `[0, 180]`
pub fn abs_angle_separation(heading: f64, bearing: f64) -> f64 {
    signed_angle_diff(heading, bearing).abs()
}

/// Point reached by travelling `distance_m` from `from` along the great circle starting at
/// `bearing_deg`
pub fn destination(from: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let angular = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = from.lat.to_radians();
    let long1 = from.long.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos()).asin();
    let long2 = long1
        + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(
        lat2.to_degrees(),
        (long2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0,
    )
}
