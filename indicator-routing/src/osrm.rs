use std::time::Duration;

use anyhow::bail;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::Value;

use indicator_logic::{GeoPoint, Maneuver, RouteService, prelude::*};

use crate::endpoint::{self, DEFAULT_ROUTE_BASE};

const USER_AGENT: &str = "SmartIndicator/1.0";
const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Deserialize)]
struct OsrmLeg {
    /// Kept raw so one bad step doesn't throw away the whole leg
    #[serde(default)]
    steps: Vec<Value>,
}

#[derive(Deserialize)]
struct OsrmStep {
    maneuver: OsrmManeuver,
}

#[derive(Deserialize)]
struct OsrmManeuver {
    /// `[long, lat]`
    location: [f64; 2],
    #[serde(rename = "type")]
    kind: String,
    modifier: Option<String>,
}

impl From<OsrmManeuver> for Maneuver {
    fn from(m: OsrmManeuver) -> Self {
        let [long, lat] = m.location;
        let modifier = m.modifier.as_deref().unwrap_or("straight");
        Maneuver::new(GeoPoint::new(lat, long), format!("{}-{modifier}", m.kind))
    }
}

/// Pull the maneuvers out of the first leg of the first route in an OSRM route response.
/// A response without a route gives an empty list, malformed steps are skipped.
pub fn parse_steps(json: &str) -> Result<Vec<Maneuver>> {
    let resp =
        serde_json::from_str::<OsrmResponse>(json).context("Failed to parse OSRM response")?;

    let Some(route) = resp.routes.into_iter().next() else {
        warn!("No routes found in response");
        return Ok(Vec::new());
    };

    let Some(leg) = route.legs.into_iter().next() else {
        warn!("No legs found in route");
        return Ok(Vec::new());
    };

    let maneuvers = leg
        .steps
        .into_iter()
        .enumerate()
        .filter_map(
            |(i, step)| match serde_json::from_value::<OsrmStep>(step) {
                Ok(step) => Some(step.maneuver.into()),
                Err(why) => {
                    warn!("Skipping malformed step {i}: {why}");
                    None
                }
            },
        )
        .collect();

    Ok(maneuvers)
}

/// [RouteService] backed by an OSRM HTTP server
pub struct OsrmRoutes {
    client: reqwest::Client,
    base: String,
}

impl OsrmRoutes {
    pub fn new() -> Result<Self> {
        Self::with_base(DEFAULT_ROUTE_BASE)
    }

    /// Use a different server, `base` is everything before the coordinates, e.g.
    /// `http://localhost:5000/route/v1/driving`
    pub fn with_base(base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(TIMEOUT)
            .read_timeout(TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base: base.into(),
        })
    }

    pub async fn request_route(&self, start: GeoPoint, end: GeoPoint) -> Result<Vec<Maneuver>> {
        let url = endpoint::route_url(&self.base, start, end);

        let body = self
            .client
            .get(&url)
            .send()
            .await
            .context("Could not send request")?
            .error_for_status()
            .context("Routing server returned error")?
            .text()
            .await
            .context("Failed to read response body")?;

        if body.is_empty() {
            bail!("Empty response body for {url}");
        }

        parse_steps(&body)
    }
}

impl RouteService for OsrmRoutes {
    async fn fetch_route(&self, start: GeoPoint, end: GeoPoint) -> Vec<Maneuver> {
        match self.request_route(start, end).await {
            Ok(maneuvers) => {
                info!("Fetched route with {} maneuvers", maneuvers.len());
                maneuvers
            }
            Err(why) => {
                error!("Failed to fetch route: {why:?}");
                Vec::new()
            }
        }
    }
}
