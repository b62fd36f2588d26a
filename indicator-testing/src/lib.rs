use std::{
    collections::VecDeque,
    io::Write,
    path::Path,
    sync::Mutex,
};

use indicator_logic::{
    BehaviorEvent, BehaviorSink, Fix, GeoPoint, IndicatorSettings, LocationService, Maneuver,
    NavSnapshot, RouteService, StateUpdateSender, geo::destination,
};
use log::error;
use rand::{
    SeedableRng,
    distr::{Distribution, Uniform},
};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail, ensure};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use prelude::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// One line of a recorded track file
pub struct TrackPoint {
    pub lat: f64,
    pub long: f64,
    pub speed_kmh: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    pub timestamp_ms: u64,
}

impl From<TrackPoint> for Fix {
    fn from(p: TrackPoint) -> Self {
        Fix::new(
            GeoPoint::new(p.lat, p.long),
            p.speed_kmh,
            p.heading,
            p.timestamp_ms,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One entry of a route file
pub struct RoutePoint {
    pub lat: f64,
    pub long: f64,
    pub code: String,
}

impl From<RoutePoint> for Maneuver {
    fn from(p: RoutePoint) -> Self {
        Maneuver::new(GeoPoint::new(p.lat, p.long), p.code)
    }
}

/// Parse a JSON lines track, blank lines are skipped
pub fn parse_track(src: &str) -> Result<Vec<Fix>> {
    src.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<TrackPoint>(line)
                .map(Fix::from)
                .with_context(|| format!("Invalid track point on line {}", i + 1))
        })
        .collect()
}

pub fn load_track(path: &Path) -> Result<Vec<Fix>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read track file {}", path.display()))?;
    parse_track(&src)
}

pub fn parse_route(src: &str) -> Result<Vec<Maneuver>> {
    let points =
        serde_json::from_str::<Vec<RoutePoint>>(src).context("Failed to parse route file")?;
    Ok(points.into_iter().map(Maneuver::from).collect())
}

pub fn load_route(path: &Path) -> Result<Vec<Maneuver>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read route file {}", path.display()))?;
    parse_route(&src)
}

/// Read [IndicatorSettings] from JSON, missing fields keep their defaults
pub fn load_settings(path: &Path) -> Result<IndicatorSettings> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings = serde_json::from_str::<IndicatorSettings>(&src)
        .context("Failed to parse settings file")?;
    settings.validate()?;
    Ok(settings)
}

/// Parse `LAT,LONG`
pub fn parse_point(raw: &str) -> Result<GeoPoint> {
    let (lat, long) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("Expected LAT,LONG, got \"{raw}\""))?;
    let lat = lat.trim().parse::<f64>().context("Invalid latitude")?;
    let long = long.trim().parse::<f64>().context("Invalid longitude")?;
    let point = GeoPoint::new(lat, long);
    ensure!(point.is_valid(), "Coordinates out of range: {lat},{long}");
    Ok(point)
}

/// Simulated receiver noise, each fix is moved up to a fixed distance in a random direction
pub struct Jitter {
    rng: ChaCha8Rng,
    bearing: Uniform<f64>,
    distance: Uniform<f64>,
}

impl Jitter {
    pub fn new(max_m: f64, seed: u64) -> Result<Self> {
        ensure!(
            max_m.is_finite() && max_m >= 0.0,
            "Jitter must be a non-negative distance, got {max_m}"
        );

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            bearing: Uniform::new(0.0, 360.0).context("Invalid bearing range")?,
            distance: Uniform::new_inclusive(0.0, max_m).context("Invalid jitter range")?,
        })
    }

    pub fn apply(&mut self, fix: Fix) -> Fix {
        let bearing = self.bearing.sample(&mut self.rng);
        let distance = self.distance.sample(&mut self.rng);
        Fix {
            point: destination(fix.point, bearing, distance),
            ..fix
        }
    }
}

pub fn jitter_track(fixes: Vec<Fix>, max_m: f64, seed: u64) -> Result<Vec<Fix>> {
    let mut jitter = Jitter::new(max_m, seed)?;
    Ok(fixes.into_iter().map(|fix| jitter.apply(fix)).collect())
}

/// [LocationService] handing out a recorded track one fix per call, then nothing
pub struct ReplayLocation {
    fixes: Mutex<VecDeque<Fix>>,
}

impl ReplayLocation {
    pub fn new(fixes: impl IntoIterator<Item = Fix>) -> Self {
        Self {
            fixes: Mutex::new(fixes.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.fixes.lock().map(|f| f.len()).unwrap_or_default()
    }
}

impl LocationService for ReplayLocation {
    fn get_fix(&self) -> Option<Fix> {
        self.fixes.lock().ok()?.pop_front()
    }
}

/// [RouteService] that always answers with the same maneuvers
pub struct StaticRoutes(Vec<Maneuver>);

impl StaticRoutes {
    pub fn new(maneuvers: Vec<Maneuver>) -> Self {
        Self(maneuvers)
    }
}

impl RouteService for StaticRoutes {
    async fn fetch_route(&self, _start: GeoPoint, _end: GeoPoint) -> Vec<Maneuver> {
        self.0.clone()
    }
}

pub struct NoUpdates;

impl StateUpdateSender for NoUpdates {
    fn send_update(&self) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// A line of replay output
pub enum ReplayLine {
    Event(BehaviorEvent),
    Snapshot(NavSnapshot),
}

/// [BehaviorSink] writing every event as a line of JSON
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn write_line(&self, line: &ReplayLine) -> Result {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("Output lock poisoned"))?;
        serde_json::to_writer(&mut *out, line).context("Failed to serialize line")?;
        writeln!(out).context("Failed to write line")?;
        out.flush().context("Failed to flush output")
    }

    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|_| anyhow!("Output lock poisoned"))
    }
}

impl<W: Write + Send> BehaviorSink for JsonLinesSink<W> {
    fn log_event(&self, event: BehaviorEvent) {
        if let Err(why) = self.write_line(&ReplayLine::Event(event)) {
            error!("Failed to record event: {why:?}");
        }
    }
}
