use serde::{Deserialize, Serialize};

use crate::geo;

/// A "part" of a location
pub type LocationComponent = f64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
/// Some point on the globe, in degrees
pub struct GeoPoint {
    /// Latitude
    pub lat: LocationComponent,
    /// Longitude
    pub long: LocationComponent,
}

impl GeoPoint {
    pub const fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self { lat, long }
    }

    /// Whether both components are finite and inside their ranges. Anything failing this is
    /// treated as a bad GPS reading and never drives a turn or a warning.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.long.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.long)
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        geo::distance(*self, *other)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A single reading from the location source
pub struct Fix {
    pub point: GeoPoint,
    /// Ground speed in km/h
    pub speed_kmh: f64,
    /// Course over ground in degrees, optional as GPS can't always determine it
    pub heading: Option<f64>,
    /// Monotonic milliseconds
    pub timestamp_ms: u64,
}

impl Fix {
    pub fn new(point: GeoPoint, speed_kmh: f64, heading: Option<f64>, timestamp_ms: u64) -> Self {
        Self {
            point,
            speed_kmh,
            heading,
            timestamp_ms,
        }
    }
}

pub trait LocationService {
    /// Latest fix, [None] while the source is interrupted (permission revoked, no signal).
    fn get_fix(&self) -> Option<Fix>;
}
