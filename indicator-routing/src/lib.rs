mod endpoint;
mod osrm;

pub use endpoint::{DEFAULT_ROUTE_BASE, route_url};
pub use osrm::{OsrmRoutes, parse_steps};
