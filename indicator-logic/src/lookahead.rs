use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    geo,
    location::GeoPoint,
    maneuver::{Maneuver, TurnKind},
    settings::IndicatorSettings,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// The indicator warning currently shown to the driver
pub struct WarningState {
    /// Empty when there's no warning
    pub text: String,
    /// Location of the maneuver that raised the warning
    pub warned_location: Option<GeoPoint>,
}

impl WarningState {
    pub fn is_active(&self) -> bool {
        !self.text.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Nearest turn ahead of the vehicle
pub struct LookaheadResult {
    pub future_direction: TurnKind,
    pub future_distance_m: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A warning raised during this evaluation
pub struct TriggeredWarning {
    pub direction: TurnKind,
    pub distance_m: u32,
    pub eta_seconds: u32,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub warning: WarningState,
    pub result: LookaheadResult,
    /// Set when a warning is raised, unless the vehicle is still inside the clear radius of
    /// the same maneuver's earlier warning
    pub triggered: Option<TriggeredWarning>,
}

fn warning_text(direction: TurnKind, distance_m: u32, eta_seconds: u32) -> String {
    format!("{direction} turn in {distance_m}m (~{eta_seconds}s) - indicator off!")
}

/// Look ahead along the maneuver list for the nearest turn in front of the vehicle and decide
/// whether the driver needs an indicator warning.
///
/// Candidates are walked nearest first. Maneuvers behind the vehicle are skipped, the first
/// real turn becomes the reported future turn, and scanning stops at the first maneuver close
/// enough (by ETA) to warn about, so a farther maneuver can never replace a nearer one's
/// warning.
pub fn evaluate(
    settings: &IndicatorSettings,
    current: GeoPoint,
    heading: f64,
    speed_kmh: f64,
    indicator_on: bool,
    maneuvers: &[Maneuver],
    warning: &WarningState,
) -> Evaluation {
    if !current.is_valid() {
        debug!("Ignoring invalid position {current:?} for lookahead");
        return Evaluation {
            warning: warning.clone(),
            ..Default::default()
        };
    }

    let mut warning = warning.clone();

    if let Some(warned) = warning.warned_location {
        if geo::distance(current, warned) > settings.warning_clear_radius_m {
            warning = WarningState::default();
        }
    }

    let mut candidates = maneuvers
        .iter()
        .filter(|m| m.location.is_valid())
        .map(|m| (m, geo::distance(current, m.location)))
        .collect::<Vec<_>>();

    // Stable, so equally distant maneuvers keep their route order
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

    let speed_mps = (speed_kmh / 3.6).max(settings.min_speed_mps);
    let lead_time = settings.lead_time_for(speed_kmh);

    let mut result = LookaheadResult::default();
    let mut found_turn = false;
    let mut triggered = None;

    for (maneuver, distance) in candidates {
        if distance > settings.lookahead_radius_m {
            break;
        }

        let eta_seconds = distance / speed_mps;

        let separation =
            geo::abs_angle_separation(heading, geo::bearing(current, maneuver.location));
        if !(separation <= settings.behind_separation_deg) {
            continue;
        }

        let direction = maneuver.turn_kind();
        if !direction.is_turn() {
            continue;
        }

        let distance_m = distance.round() as u32;

        if !found_turn {
            found_turn = true;
            result = LookaheadResult {
                future_direction: direction,
                future_distance_m: distance_m,
            };
        }

        if !indicator_on && eta_seconds <= lead_time {
            let eta = eta_seconds.round() as u32;
            let repeat = warning.warned_location == Some(maneuver.location);
            warning = WarningState {
                text: warning_text(direction, distance_m, eta),
                warned_location: Some(maneuver.location),
            };

            if repeat {
                debug!("Still warning about {direction} turn in {distance_m}m");
            } else {
                info!("Warning: {direction} turn in {distance_m}m (~{eta}s) with indicator off");
                triggered = Some(TriggeredWarning {
                    direction,
                    distance_m,
                    eta_seconds: eta,
                    location: maneuver.location,
                });
            }
            break;
        }
    }

    Evaluation {
        warning,
        result,
        triggered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;

    const HERE: GeoPoint = GeoPoint::new(18.5204, 73.8567);
    const NORTH: f64 = 0.0;

    fn settings() -> IndicatorSettings {
        IndicatorSettings::default()
    }

    fn ahead(bearing: f64, distance: f64, code: &str) -> Maneuver {
        Maneuver::new(destination(HERE, bearing, distance), code)
    }

    fn run(speed: f64, indicator_on: bool, maneuvers: &[Maneuver]) -> Evaluation {
        evaluate(
            &settings(),
            HERE,
            NORTH,
            speed,
            indicator_on,
            maneuvers,
            &WarningState::default(),
        )
    }

    #[test]
    fn test_empty_route() {
        let eval = run(50.0, false, &[]);
        assert_eq!(eval.result.future_direction, TurnKind::Straight);
        assert_eq!(eval.result.future_distance_m, 0);
        assert!(!eval.warning.is_active());
        assert!(eval.triggered.is_none());
    }

    #[test]
    fn test_far_turn_reported_without_warning() {
        // 250m at 70km/h is ~13s away, over the 6s lead time
        let eval = run(70.0, false, &[ahead(NORTH, 250.0, "turn-left")]);
        assert_eq!(eval.result.future_direction, TurnKind::Left);
        assert_eq!(eval.result.future_distance_m, 250);
        assert!(!eval.warning.is_active());
        assert!(eval.triggered.is_none());
    }

    #[test]
    fn test_warning_fires_inside_lead_time() {
        let turn = ahead(NORTH, 250.0, "turn-left");
        // 250m at 160km/h is ~5.6s away
        let eval = run(160.0, false, std::slice::from_ref(&turn));
        assert!(eval.warning.is_active());
        assert!(eval.warning.text.contains("left"), "{}", eval.warning.text);
        assert!(eval.warning.text.contains("250"), "{}", eval.warning.text);
        assert_eq!(eval.warning.warned_location, Some(turn.location));

        let triggered = eval.triggered.expect("Warning not triggered");
        assert_eq!(triggered.direction, TurnKind::Left);
        assert_eq!(triggered.distance_m, 250);
        assert_eq!(triggered.eta_seconds, 6);
    }

    #[test]
    fn test_lead_time_switches_at_40_and_60() {
        let turn = [ahead(NORTH, 100.0, "turn-right")];
        // ~9.2s away, under the 12s lead time
        assert!(run(39.0, false, &turn).warning.is_active());
        // ~8.8s away, over the 8s lead time
        assert!(!run(41.0, false, &turn).warning.is_active());

        let turn = [ahead(NORTH, 110.0, "turn-right")];
        // ~6.7s away, under the 8s lead time
        assert!(run(59.0, false, &turn).warning.is_active());
        // ~6.5s away, over the 6s lead time
        assert!(!run(61.0, false, &turn).warning.is_active());
    }

    #[test]
    fn test_slow_speed_at_30() {
        // ~10.8s away at 30km/h, under the 12s lead time
        let eval = run(30.0, false, &[ahead(NORTH, 90.0, "turn-slight right")]);
        assert!(eval.warning.is_active());
        assert!(eval.warning.text.starts_with("slight right"));
    }

    #[test]
    fn test_indicator_on_suppresses_warning() {
        let eval = run(160.0, true, &[ahead(NORTH, 250.0, "turn-left")]);
        assert!(!eval.warning.is_active());
        assert!(eval.triggered.is_none());
        assert_eq!(eval.result.future_direction, TurnKind::Left);
    }

    #[test]
    fn test_behind_candidate_skipped() {
        let behind = ahead(120.0, 50.0, "turn-left");
        let in_front = ahead(45.0, 150.0, "turn-right");
        let eval = run(30.0, false, &[behind, in_front]);
        assert_eq!(eval.result.future_direction, TurnKind::Right);
        assert_eq!(eval.result.future_distance_m, 150);
    }

    #[test]
    fn test_all_behind_resets_to_straight() {
        let eval = run(30.0, false, &[ahead(180.0, 40.0, "turn-left")]);
        assert_eq!(eval.result, LookaheadResult::default());
    }

    #[test]
    fn test_straight_maneuvers_skipped() {
        let eval = run(
            30.0,
            false,
            &[
                ahead(NORTH, 20.0, "depart-straight"),
                ahead(NORTH, 80.0, "turn-sharp left"),
            ],
        );
        assert_eq!(eval.result.future_direction, TurnKind::SharpLeft);
        assert_eq!(eval.result.future_distance_m, 80);
    }

    #[test]
    fn test_beyond_radius_ignored() {
        let eval = run(30.0, false, &[ahead(NORTH, 301.0, "turn-left")]);
        assert_eq!(eval.result, LookaheadResult::default());
    }

    #[test]
    fn test_nearest_warning_wins() {
        // Listed farthest first, both inside the lead time
        let eval = run(
            30.0,
            false,
            &[ahead(NORTH, 80.0, "turn-right"), ahead(NORTH, 50.0, "turn-left")],
        );
        let triggered = eval.triggered.expect("Warning not triggered");
        assert_eq!(triggered.direction, TurnKind::Left);
        assert_eq!(triggered.distance_m, 50);
        assert!(eval.warning.text.starts_with("left"));
    }

    #[test]
    fn test_warning_cleared_only_after_leaving_radius() {
        let warned = destination(HERE, NORTH, 5.0);
        let state = WarningState {
            text: "left turn in 5m (~1s) - indicator off!".to_string(),
            warned_location: Some(warned),
        };

        let near = evaluate(&settings(), HERE, NORTH, 30.0, false, &[], &state);
        assert_eq!(near.warning, state);

        let far = destination(warned, 180.0, 15.0);
        let cleared = evaluate(&settings(), far, NORTH, 30.0, false, &[], &state);
        assert!(!cleared.warning.is_active());
        assert!(cleared.warning.warned_location.is_none());
    }

    #[test]
    fn test_repeat_warning_inside_clear_radius_not_retriggered() {
        let turn = [ahead(NORTH, 6.0, "turn-left")];
        let first = run(30.0, false, &turn);
        assert!(first.triggered.is_some());

        let second = evaluate(&settings(), HERE, NORTH, 30.0, false, &turn, &first.warning);
        assert!(second.warning.is_active());
        assert!(second.triggered.is_none());
    }

    #[test]
    fn test_warning_retriggers_after_leaving_clear_radius() {
        let turn = [ahead(NORTH, 60.0, "turn-left")];
        let first = run(30.0, false, &turn);
        assert!(first.triggered.is_some());

        // 40m short of the turn, so the old warning is cleared before scanning
        let closer = destination(HERE, NORTH, 20.0);
        let second = evaluate(&settings(), closer, NORTH, 30.0, false, &turn, &first.warning);
        let triggered = second.triggered.expect("Warning not triggered again");
        assert_eq!(triggered.direction, TurnKind::Left);
        assert_eq!(triggered.distance_m, 40);
        assert_eq!(second.warning.warned_location, Some(turn[0].location));
    }

    #[test]
    fn test_equal_distance_keeps_route_order() {
        let spot = destination(HERE, NORTH, 50.0);
        let eval = run(
            30.0,
            false,
            &[
                Maneuver::new(spot, "turn-right"),
                Maneuver::new(spot, "turn-left"),
            ],
        );
        assert_eq!(eval.result.future_direction, TurnKind::Right);
        let triggered = eval.triggered.expect("Warning not triggered");
        assert_eq!(triggered.direction, TurnKind::Right);
        assert!(eval.warning.text.starts_with("right"));

        let eval = run(
            30.0,
            false,
            &[
                Maneuver::new(spot, "turn-left"),
                Maneuver::new(spot, "turn-right"),
            ],
        );
        assert_eq!(eval.result.future_direction, TurnKind::Left);
    }

    #[test]
    fn test_invalid_position_keeps_state() {
        let state = WarningState {
            text: "right turn in 40m (~4s) - indicator off!".to_string(),
            warned_location: Some(HERE),
        };
        let eval = evaluate(
            &settings(),
            GeoPoint::new(f64::NAN, f64::NAN),
            NORTH,
            30.0,
            false,
            &[ahead(NORTH, 50.0, "turn-left")],
            &state,
        );
        assert_eq!(eval.warning, state);
        assert_eq!(eval.result, LookaheadResult::default());
        assert!(eval.triggered.is_none());
    }

    #[test]
    fn test_nan_heading_skips_everything() {
        let eval = evaluate(
            &settings(),
            HERE,
            f64::NAN,
            30.0,
            false,
            &[ahead(NORTH, 50.0, "turn-left")],
            &WarningState::default(),
        );
        assert_eq!(eval.result, LookaheadResult::default());
        assert!(!eval.warning.is_active());
    }
}
