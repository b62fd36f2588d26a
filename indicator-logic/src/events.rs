use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{location::GeoPoint, maneuver::TurnKind, session::UtcDT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Why a [BehaviorEvent] was recorded
pub enum BehaviorTag {
    /// The detector saw the vehicle start a turn
    #[serde(rename = "Turn Detected")]
    TurnDetected,
    /// An upcoming maneuver raised an indicator warning
    #[serde(rename = "Warning Triggered")]
    WarningTriggered,
    /// The driver switched the indicator on or off
    #[serde(rename = "Indicator Toggled")]
    IndicatorToggled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A record of driver behavior, handed to a [crate::BehaviorSink]
pub struct BehaviorEvent {
    /// The tracking session this happened in
    pub session: Uuid,
    pub timestamp: UtcDT,
    /// Where the vehicle was
    pub location: GeoPoint,
    pub tag: BehaviorTag,
    pub direction: TurnKind,
    pub speed_kmh: f64,
    /// Distance to the relevant maneuver, 0 for turns happening right now
    pub distance_to_turn_m: u32,
    pub indicator_on: bool,
}
