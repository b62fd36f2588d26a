use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Kind of turn a maneuver asks for
pub enum TurnKind {
    #[default]
    Straight,
    Left,
    Right,
    SlightLeft,
    SlightRight,
    SharpLeft,
    SharpRight,
}

impl TurnKind {
    /// Classify a maneuver modifier such as `"slight left"`, ignoring case
    pub fn from_modifier(modifier: &str) -> Self {
        let modifier = modifier.to_lowercase();
        match modifier.as_str() {
            "slight left" => Self::SlightLeft,
            "sharp left" => Self::SharpLeft,
            m if m.contains("left") => Self::Left,
            "slight right" => Self::SlightRight,
            "sharp right" => Self::SharpRight,
            m if m.contains("right") => Self::Right,
            _ => Self::Straight,
        }
    }

    pub fn is_turn(self) -> bool {
        self != Self::Straight
    }

    /// Human readable name, used in warning text
    pub fn label(self) -> &'static str {
        match self {
            Self::Straight => "straight",
            Self::Left => "left",
            Self::Right => "right",
            Self::SlightLeft => "slight left",
            Self::SlightRight => "slight right",
            Self::SharpLeft => "sharp left",
            Self::SharpRight => "sharp right",
        }
    }
}

impl fmt::Display for TurnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A single routing instruction and where it happens
pub struct Maneuver {
    pub location: GeoPoint,
    /// `"type-modifier"`, e.g. `"turn-slight left"`
    pub code: String,
}

impl Maneuver {
    pub fn new(location: GeoPoint, code: impl Into<String>) -> Self {
        Self {
            location,
            code: code.into(),
        }
    }

    /// Everything after the first `-`, [None] if the code has no modifier
    pub fn modifier(&self) -> Option<&str> {
        self.code.split_once('-').map(|(_, modifier)| modifier)
    }

    /// Maneuvers without a modifier are treated as straight
    pub fn turn_kind(&self) -> TurnKind {
        self.modifier()
            .map(TurnKind::from_modifier)
            .unwrap_or_default()
    }
}
