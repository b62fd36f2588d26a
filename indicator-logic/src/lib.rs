mod events;
pub mod geo;
mod location;
mod lookahead;
mod maneuver;
mod navigator;
mod route;
mod session;
mod settings;
mod turn_detector;

pub use events::{BehaviorEvent, BehaviorTag};
pub use location::{Fix, GeoPoint, LocationService};
pub use lookahead::{Evaluation, LookaheadResult, TriggeredWarning, WarningState, evaluate};
pub use maneuver::{Maneuver, TurnKind};
pub use navigator::{Navigator, StateUpdateSender};
pub use route::{AdvisoryInput, BehaviorSink, IndicatorAdvisor, RouteService};
pub use session::{NavSession, NavSnapshot, RouteRequest, UtcDT};
pub use settings::{IndicatorSettings, LeadTimeTier};
pub use turn_detector::{PositionSample, TurnDetector, TurnDirection};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
