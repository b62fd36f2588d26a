use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    geo,
    location::{Fix, GeoPoint},
    maneuver::TurnKind,
    settings::IndicatorSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What the vehicle is doing right now
pub enum TurnDirection {
    #[default]
    Straight,
    Left,
    Right,
}

impl TurnDirection {
    pub fn is_turn(self) -> bool {
        self != Self::Straight
    }
}

impl From<TurnDirection> for TurnKind {
    fn from(value: TurnDirection) -> Self {
        match value {
            TurnDirection::Straight => TurnKind::Straight,
            TurnDirection::Left => TurnKind::Left,
            TurnDirection::Right => TurnKind::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// A position kept in the detector's window
pub struct PositionSample {
    pub point: GeoPoint,
    pub timestamp_ms: u64,
    pub bearing: Option<f64>,
}

impl PositionSample {
    pub fn new(point: GeoPoint, timestamp_ms: u64) -> Self {
        Self {
            point,
            timestamp_ms,
            bearing: None,
        }
    }
}

impl From<&Fix> for PositionSample {
    fn from(fix: &Fix) -> Self {
        Self {
            point: fix.point,
            timestamp_ms: fix.timestamp_ms,
            bearing: fix.heading.map(geo::normalize_degrees),
        }
    }
}

/// Classifies a stream of positions into left/right/straight by looking at how the bearing
/// changes over the last three fixes.
///
/// Once a turn is reported, positions within [IndicatorSettings::turn_hysteresis_m] of it
/// report straight so a single corner isn't reported several times.
#[derive(Debug, Clone)]
pub struct TurnDetector {
    history: VecDeque<PositionSample>,
    last_turn_location: Option<GeoPoint>,
    history_len: usize,
    min_history: usize,
    min_speed_kmh: f64,
    threshold_deg: f64,
    hysteresis_m: f64,
}

impl TurnDetector {
    pub fn new(settings: &IndicatorSettings) -> Self {
        Self {
            history: VecDeque::with_capacity(settings.history_len + 1),
            last_turn_location: None,
            history_len: settings.history_len,
            min_history: settings.min_history.max(3),
            min_speed_kmh: settings.min_turn_speed_kmh,
            threshold_deg: settings.turn_threshold_deg,
            hysteresis_m: settings.turn_hysteresis_m,
        }
    }

    pub fn detect_turn(&mut self, sample: PositionSample, speed_kmh: f64) -> TurnDirection {
        if !sample.point.is_valid() {
            debug!("Ignoring invalid position {:?}", sample.point);
            return TurnDirection::Straight;
        }

        self.history.push_back(sample);
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }

        if self.history.len() < self.min_history {
            return TurnDirection::Straight;
        }

        // Written negated so a NaN speed also lands here
        if !(speed_kmh >= self.min_speed_kmh) {
            return TurnDirection::Straight;
        }

        if let Some(last_turn) = self.last_turn_location {
            if geo::distance(sample.point, last_turn) < self.hysteresis_m {
                return TurnDirection::Straight;
            }
        }

        let n = self.history.len();
        let (p0, p1, p2) = (
            self.history[n - 3].point,
            self.history[n - 2].point,
            self.history[n - 1].point,
        );

        let diff = geo::signed_angle_diff(geo::bearing(p0, p1), geo::bearing(p1, p2));

        let direction = if diff > self.threshold_deg {
            TurnDirection::Right
        } else if diff < -self.threshold_deg {
            TurnDirection::Left
        } else {
            TurnDirection::Straight
        };

        if direction.is_turn() {
            debug!("Bearing changed {diff:.1} degrees, reporting {direction:?}");
            self.last_turn_location = Some(sample.point);
        }

        direction
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_turn_location(&self) -> Option<GeoPoint> {
        self.last_turn_location
    }

    /// Forget everything, used when the location source restarts
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_turn_location = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;

    const ORIGIN: GeoPoint = GeoPoint::new(18.5204, 73.8567);
    const SPEED: f64 = 30.0;

    fn detector() -> TurnDetector {
        TurnDetector::new(&IndicatorSettings::default())
    }

    fn sample(point: GeoPoint, t: u64) -> PositionSample {
        PositionSample::new(point, t * 1000)
    }

    /// Feeds an L shape: two fixes heading north, then one leg towards `exit_bearing`
    fn feed_corner(det: &mut TurnDetector, exit_bearing: f64, speed: f64) -> Vec<TurnDirection> {
        let p1 = destination(ORIGIN, 0.0, 20.0);
        let p2 = destination(p1, exit_bearing, 20.0);
        vec![
            det.detect_turn(sample(ORIGIN, 0), speed),
            det.detect_turn(sample(p1, 1), speed),
            det.detect_turn(sample(p2, 2), speed),
        ]
    }

    #[test]
    fn test_short_history_is_straight() {
        let mut det = detector();
        let p1 = destination(ORIGIN, 0.0, 20.0);
        assert_eq!(det.detect_turn(sample(ORIGIN, 0), SPEED), TurnDirection::Straight);
        assert_eq!(det.detect_turn(sample(p1, 1), SPEED), TurnDirection::Straight);
        assert_eq!(det.history_len(), 2);
    }

    #[test]
    fn test_detects_left_and_right() {
        let mut det = detector();
        let res = feed_corner(&mut det, 270.0, SPEED);
        assert_eq!(res[2], TurnDirection::Left);

        let mut det = detector();
        let res = feed_corner(&mut det, 90.0, SPEED);
        assert_eq!(res[2], TurnDirection::Right);
        assert!(det.last_turn_location().is_some());
    }

    #[test]
    fn test_gentle_curve_is_straight() {
        let mut det = detector();
        let res = feed_corner(&mut det, 15.0, SPEED);
        assert!(res.iter().all(|d| *d == TurnDirection::Straight));
        assert!(det.last_turn_location().is_none());
    }

    #[test]
    fn test_slow_speed_is_straight() {
        let mut det = detector();
        let res = feed_corner(&mut det, 270.0, 1.0);
        assert!(res.iter().all(|d| *d == TurnDirection::Straight));
    }

    #[test]
    fn test_nan_speed_is_straight() {
        let mut det = detector();
        let res = feed_corner(&mut det, 270.0, f64::NAN);
        assert!(res.iter().all(|d| *d == TurnDirection::Straight));
    }

    #[test]
    fn test_hysteresis_suppresses_nearby_turn() {
        let mut det = detector();
        let res = feed_corner(&mut det, 270.0, SPEED);
        assert_eq!(res[2], TurnDirection::Left);
        let turn_point = det.last_turn_location().expect("Turn location not stored");

        // Heading west then jogging south would be another left, but it's only 29m away
        let near = destination(turn_point, 180.0, 29.0);
        assert_eq!(det.detect_turn(sample(near, 3), SPEED), TurnDirection::Straight);

        // Far enough away, the next corner is reported again
        let far = destination(near, 90.0, 40.0);
        assert!(geo::distance(far, turn_point) > 30.0);
        assert_eq!(det.detect_turn(sample(far, 4), SPEED), TurnDirection::Left);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut det = detector();
        for i in 0..25 {
            let p = destination(ORIGIN, 0.0, i as f64 * 10.0);
            assert_eq!(det.detect_turn(sample(p, i), SPEED), TurnDirection::Straight);
        }
        assert_eq!(det.history_len(), 10);
    }

    #[test]
    fn test_invalid_position_is_ignored() {
        let mut det = detector();
        feed_corner(&mut det, 0.0, SPEED);
        let bad = GeoPoint::new(f64::NAN, 73.0);
        assert_eq!(det.detect_turn(sample(bad, 3), SPEED), TurnDirection::Straight);
        let out_of_range = GeoPoint::new(91.0, 73.0);
        assert_eq!(
            det.detect_turn(sample(out_of_range, 4), SPEED),
            TurnDirection::Straight
        );
        assert_eq!(det.history_len(), 3);
    }

    #[test]
    fn test_reset() {
        let mut det = detector();
        feed_corner(&mut det, 90.0, SPEED);
        det.reset();
        assert_eq!(det.history_len(), 0);
        assert!(det.last_turn_location().is_none());
    }
}
