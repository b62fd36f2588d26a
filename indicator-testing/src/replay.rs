use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use indicator_logic::{GeoPoint, Maneuver, Navigator};
use indicator_replay_shared::*;
use indicator_routing::OsrmRoutes;
use log::info;

#[derive(Parser)]
/// Replay a recorded track through the turn detector and lookahead, printing behavior events
/// and the final state as JSON lines
struct Cli {
    /// JSON lines file of recorded fixes
    track: PathBuf,

    /// JSON array of maneuvers to follow
    #[arg(long, conflicts_with = "osrm")]
    route: Option<PathBuf>,

    /// Fetch the route from OSRM before replaying, needs --destination
    #[arg(long, requires = "destination")]
    osrm: bool,

    /// Where the route ends as LAT,LONG, defaults to the last maneuver of --route
    #[arg(long, value_parser = parse_point)]
    destination: Option<GeoPoint>,

    /// Time between fixes
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Move each fix up to this many meters in a random direction
    #[arg(long, default_value_t = 0.0)]
    jitter_m: f64,

    /// Seed for --jitter-m
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Start with the indicator switched on
    #[arg(long)]
    indicator_on: bool,

    /// JSON file of indicator settings
    #[arg(long)]
    settings: Option<PathBuf>,
}

async fn resolve_route(
    cli: &Cli,
    start: GeoPoint,
) -> Result<(Vec<Maneuver>, Option<GeoPoint>)> {
    if cli.osrm {
        let destination = cli
            .destination
            .context("--osrm needs a --destination")?;
        let routes = OsrmRoutes::new()?;
        let maneuvers = routes
            .request_route(start, destination)
            .await
            .context("Failed to fetch route from OSRM")?;
        Ok((maneuvers, Some(destination)))
    } else if let Some(path) = &cli.route {
        let maneuvers = load_route(path)?;
        let destination = cli
            .destination
            .or_else(|| maneuvers.last().map(|m| m.location));
        Ok((maneuvers, destination))
    } else {
        Ok((Vec::new(), cli.destination))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    let settings = cli
        .settings
        .as_deref()
        .map(load_settings)
        .transpose()?
        .unwrap_or_default();

    let mut fixes = load_track(&cli.track)?;
    if cli.jitter_m > 0.0 {
        fixes = jitter_track(fixes, cli.jitter_m, cli.seed)?;
    }

    let start = fixes.first().context("Track has no fixes")?.point;

    // The OSRM fetch happens in real time, everything after runs on a paused clock
    let (maneuvers, destination) = resolve_route(&cli, start).await?;
    info!(
        "Replaying {} fixes against {} maneuvers",
        fixes.len(),
        maneuvers.len()
    );

    tokio::time::pause();

    let ticks = u32::try_from(fixes.len()).context("Track too long")?;
    let interval = Duration::from_millis(cli.interval_ms.max(1));

    let navigator = Arc::new(Navigator::new(
        interval,
        settings,
        ReplayLocation::new(fixes),
        Arc::new(StaticRoutes::new(maneuvers)),
        JsonLinesSink::new(std::io::stdout()),
        NoUpdates,
    )?);

    navigator.set_destination(destination).await;
    if cli.indicator_on {
        navigator.set_indicator(true).await;
    }

    let handle = tokio::spawn({
        let navigator = navigator.clone();
        async move { navigator.main_loop().await }
    });

    tokio::time::sleep(interval * (ticks + 1)).await;
    navigator.quit().await;

    let snapshot = handle.await.context("Replay task failed")?;

    JsonLinesSink::new(std::io::stdout()).write_line(&ReplayLine::Snapshot(snapshot))
}
