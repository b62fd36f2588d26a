use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    events::{BehaviorEvent, BehaviorTag},
    location::{Fix, GeoPoint},
    lookahead::{self, LookaheadResult, WarningState},
    maneuver::{Maneuver, TurnKind},
    route::AdvisoryInput,
    settings::IndicatorSettings,
    turn_detector::{PositionSample, TurnDetector, TurnDirection},
};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Everything a UI needs to show about the current session
pub struct NavSnapshot {
    /// Last valid position, [None] before the first fix
    pub position: Option<GeoPoint>,
    pub speed_kmh: f64,
    pub heading: Option<f64>,
    pub detected_turn: TurnDirection,
    pub future_direction: TurnKind,
    pub future_distance_m: u32,
    /// Empty when there's no warning
    pub warning: String,
    pub indicator_on: bool,
    pub advisory_forget_indicator: bool,
    pub destination: Option<GeoPoint>,
    pub maneuver_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A route fetch the session wants made
pub struct RouteRequest {
    pub start: GeoPoint,
    pub end: GeoPoint,
    /// Bumped on every destination change, results for older generations are dropped
    pub generation: u64,
}

#[derive(Debug, Clone)]
/// All state for one tracking session. Every fix goes through [NavSession::process_fix] one
/// at a time, nothing else mutates the detector or warning state.
pub struct NavSession {
    pub id: Uuid,
    settings: IndicatorSettings,
    detector: TurnDetector,
    detected_turn: TurnDirection,
    warning: WarningState,
    lookahead: LookaheadResult,
    maneuvers: Vec<Maneuver>,
    destination: Option<GeoPoint>,
    indicator_on: bool,
    advisory: bool,
    last_fix: Option<Fix>,
    route_generation: u64,
    route_in_flight: bool,
    last_route_request: Option<Instant>,
}

impl NavSession {
    pub fn new(settings: IndicatorSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            detector: TurnDetector::new(&settings),
            settings,
            detected_turn: TurnDirection::Straight,
            warning: WarningState::default(),
            lookahead: LookaheadResult::default(),
            maneuvers: Vec::with_capacity(30),
            destination: None,
            indicator_on: false,
            advisory: false,
            last_fix: None,
            route_generation: 0,
            route_in_flight: false,
            last_route_request: None,
        }
    }

    fn make_event(
        &self,
        now: UtcDT,
        fix: &Fix,
        tag: BehaviorTag,
        direction: TurnKind,
        distance_to_turn_m: u32,
    ) -> BehaviorEvent {
        BehaviorEvent {
            session: self.id,
            timestamp: now,
            location: fix.point,
            tag,
            direction,
            speed_kmh: fix.speed_kmh,
            distance_to_turn_m,
            indicator_on: self.indicator_on,
        }
    }

    /// Run one fix through the turn detector and then the lookahead, returning the behavior
    /// events it caused
    pub fn process_fix(&mut self, fix: &Fix, now: UtcDT) -> Vec<BehaviorEvent> {
        let mut events = Vec::with_capacity(2);

        let previous = self.detected_turn;
        self.detected_turn = self
            .detector
            .detect_turn(PositionSample::from(fix), fix.speed_kmh);

        if self.detected_turn.is_turn() && self.detected_turn != previous {
            info!("Turn detected: {:?}", self.detected_turn);
            events.push(self.make_event(
                now,
                fix,
                BehaviorTag::TurnDetected,
                self.detected_turn.into(),
                0,
            ));
        }

        let eval = lookahead::evaluate(
            &self.settings,
            fix.point,
            fix.heading.unwrap_or(0.0),
            fix.speed_kmh,
            self.indicator_on,
            &self.maneuvers,
            &self.warning,
        );

        self.warning = eval.warning;
        self.lookahead = eval.result;

        if let Some(triggered) = eval.triggered {
            events.push(self.make_event(
                now,
                fix,
                BehaviorTag::WarningTriggered,
                triggered.direction,
                triggered.distance_m,
            ));
        }

        if fix.point.is_valid() {
            self.last_fix = Some(*fix);
        }

        events
    }

    /// Forget the detector's window, used when the location source comes back after an
    /// interruption so old fixes don't pair up with new ones
    pub fn restart_tracking(&mut self) {
        debug!("Restarting turn tracking");
        self.detector.reset();
        self.detected_turn = TurnDirection::Straight;
    }

    /// Switch the indicator, returns an event if it actually changed and we know where we are
    pub fn set_indicator(&mut self, on: bool, now: UtcDT) -> Option<BehaviorEvent> {
        if self.indicator_on == on {
            return None;
        }

        self.indicator_on = on;

        if on {
            // The driver did what the warning asked
            self.warning = WarningState::default();
        }

        self.last_fix.map(|fix| {
            self.make_event(
                now,
                &fix,
                BehaviorTag::IndicatorToggled,
                self.detected_turn.into(),
                self.lookahead.future_distance_m,
            )
        })
    }

    /// Change where we're going, the current route is dropped and a new one will be requested
    pub fn set_destination(&mut self, destination: Option<GeoPoint>) {
        self.destination = destination;
        self.route_generation += 1;
        self.maneuvers.clear();
        self.last_route_request = None;
    }

    /// If a route fetch is due, mark one as in flight and return what to fetch.
    /// Due means there's a destination and a position, nothing is in flight, and either no
    /// fetch was made yet or the refresh interval (retry interval with an empty route) passed.
    pub fn needs_route(&mut self, now: Instant) -> Option<RouteRequest> {
        if self.route_in_flight {
            return None;
        }

        let end = self.destination?;
        let start = self.last_fix?.point;

        let due = match self.last_route_request {
            None => true,
            Some(last) => {
                let wait = if self.maneuvers.is_empty() {
                    self.settings.route_retry_seconds
                } else {
                    self.settings.route_refresh_seconds
                };
                now.saturating_duration_since(last).as_secs() >= wait
            }
        };

        if !due {
            return None;
        }

        self.route_in_flight = true;
        self.last_route_request = Some(now);

        Some(RouteRequest {
            start,
            end,
            generation: self.route_generation,
        })
    }

    /// Swap in a freshly fetched route. Returns whether it was used, results for an old
    /// destination are dropped.
    pub fn apply_route(&mut self, generation: u64, maneuvers: Vec<Maneuver>) -> bool {
        self.route_in_flight = false;

        if generation != self.route_generation {
            debug!("Dropping route for an old destination");
            return false;
        }

        info!("Route updated with {} maneuvers", maneuvers.len());
        self.maneuvers = maneuvers;
        true
    }

    pub fn advisory_input(&self) -> Option<AdvisoryInput> {
        self.last_fix.map(|fix| AdvisoryInput {
            lat: fix.point.lat,
            long: fix.point.long,
            speed_kmh: fix.speed_kmh,
            direction_code: match self.detected_turn {
                TurnDirection::Left => 1,
                TurnDirection::Right => 2,
                TurnDirection::Straight => 0,
            },
            future_distance_m: self.lookahead.future_distance_m,
        })
    }

    pub fn set_advisory(&mut self, forget_indicator: bool) {
        self.advisory = forget_indicator;
    }

    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            position: self.last_fix.map(|fix| fix.point),
            speed_kmh: self.last_fix.map(|fix| fix.speed_kmh).unwrap_or_default(),
            heading: self.last_fix.and_then(|fix| fix.heading),
            detected_turn: self.detected_turn,
            future_direction: self.lookahead.future_direction,
            future_distance_m: self.lookahead.future_distance_m,
            warning: self.warning.text.clone(),
            indicator_on: self.indicator_on,
            advisory_forget_indicator: self.advisory,
            destination: self.destination,
            maneuver_count: self.maneuvers.len(),
        }
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    pub fn maneuvers(&self) -> &[Maneuver] {
        &self.maneuvers
    }

    pub fn warning(&self) -> &WarningState {
        &self.warning
    }

    pub fn detected_turn(&self) -> TurnDirection {
        self.detected_turn
    }

    pub fn route_in_flight(&self) -> bool {
        self.route_in_flight
    }
}
