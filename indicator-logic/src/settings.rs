use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Lead time used when travelling faster than `above_kmh`
pub struct LeadTimeTier {
    pub above_kmh: f64,
    pub lead_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Tunables for turn detection and upcoming-turn warnings
pub struct IndicatorSettings {
    /// Number of fixes kept in the turn detector's window
    pub history_len: usize,
    /// Fixes needed before the detector reports anything but straight
    pub min_history: usize,
    /// Below this speed the bearing between fixes is too noisy to trust
    pub min_turn_speed_kmh: f64,
    /// Bearing change between consecutive legs that counts as a turn
    pub turn_threshold_deg: f64,
    /// After a turn, fixes closer than this to it never report another turn
    pub turn_hysteresis_m: f64,
    /// A warning clears once the vehicle is further than this from the warned maneuver
    pub warning_clear_radius_m: f64,
    /// Maneuvers further away than this are ignored
    pub lookahead_radius_m: f64,
    /// Maneuvers further off the heading than this are considered behind the vehicle
    pub behind_separation_deg: f64,
    /// Floor for the speed used when computing ETAs
    pub min_speed_mps: f64,
    /// Checked in order, the first tier whose speed is exceeded wins
    pub lead_time_tiers: Vec<LeadTimeTier>,
    /// Lead time when no tier matches
    pub default_lead_seconds: f64,
    /// Seconds between route refreshes
    pub route_refresh_seconds: u64,
    /// Seconds between retries while the route is empty
    pub route_retry_seconds: u64,
}

impl IndicatorSettings {
    /// How many seconds ahead of a maneuver the driver should be warned at this speed
    pub fn lead_time_for(&self, speed_kmh: f64) -> f64 {
        self.lead_time_tiers
            .iter()
            .find(|tier| speed_kmh > tier.above_kmh)
            .map(|tier| tier.lead_seconds)
            .unwrap_or(self.default_lead_seconds)
    }

    pub fn validate(&self) -> Result {
        ensure!(
            self.min_history >= 3,
            "min_history must be at least 3, got {}",
            self.min_history
        );
        ensure!(
            self.history_len >= self.min_history,
            "history_len ({}) must hold at least min_history ({}) fixes",
            self.history_len,
            self.min_history
        );

        let non_negative = [
            ("min_turn_speed_kmh", self.min_turn_speed_kmh),
            ("turn_threshold_deg", self.turn_threshold_deg),
            ("turn_hysteresis_m", self.turn_hysteresis_m),
            ("warning_clear_radius_m", self.warning_clear_radius_m),
            ("lookahead_radius_m", self.lookahead_radius_m),
            ("behind_separation_deg", self.behind_separation_deg),
            ("default_lead_seconds", self.default_lead_seconds),
        ];

        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                bail!("{name} must be a finite, non-negative number, got {value}");
            }
        }

        ensure!(
            self.min_speed_mps > 0.0,
            "min_speed_mps must be positive to avoid dividing by zero"
        );

        for pair in self.lead_time_tiers.windows(2) {
            ensure!(
                pair[0].above_kmh > pair[1].above_kmh,
                "lead_time_tiers must be ordered fastest first"
            );
        }

        Ok(())
    }
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            history_len: 10,
            min_history: 3,
            min_turn_speed_kmh: 2.0,
            turn_threshold_deg: 25.0,
            turn_hysteresis_m: 30.0,
            warning_clear_radius_m: 10.0,
            lookahead_radius_m: 300.0,
            behind_separation_deg: 90.0,
            min_speed_mps: 0.1,
            lead_time_tiers: vec![
                LeadTimeTier {
                    above_kmh: 60.0,
                    lead_seconds: 6.0,
                },
                LeadTimeTier {
                    above_kmh: 40.0,
                    lead_seconds: 8.0,
                },
            ],
            default_lead_seconds: 12.0,
            route_refresh_seconds: 30,
            route_retry_seconds: 5,
        }
    }
}
