use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{events::BehaviorEvent, location::GeoPoint, maneuver::Maneuver};

pub trait RouteService: Send + Sync + 'static {
    /// Get the maneuvers on the way from `start` to `end`, in route order.
    /// Failures are the implementor's to log, they must come back as an empty list.
    fn fetch_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> impl Future<Output = Vec<Maneuver>> + Send;
}

pub trait BehaviorSink: Send + Sync {
    /// Record an event. This must not block, and any failure stays inside the sink.
    fn log_event(&self, event: BehaviorEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Features handed to an [IndicatorAdvisor]
pub struct AdvisoryInput {
    pub lat: f64,
    pub long: f64,
    pub speed_kmh: f64,
    /// 1 for a left turn in progress, 2 for right, 0 otherwise
    pub direction_code: u8,
    pub future_distance_m: u32,
}

/// Optional predictor guessing whether the driver is about to forget their indicator
pub trait IndicatorAdvisor: Send + Sync {
    fn predict(&self, input: AdvisoryInput) -> bool;
}
