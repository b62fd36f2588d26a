use indicator_logic::GeoPoint;

const fn osrm_host() -> &'static str {
    if let Some(host) = option_env!("OSRM_HOST") {
        host
    } else {
        "router.project-osrm.org"
    }
}

const fn osrm_secure() -> bool {
    if let Some(secure) = option_env!("OSRM_SECURE") {
        const_str::eq_ignore_ascii_case!(secure, "true") || const_str::equal!(secure, "1")
    } else {
        true
    }
}

const fn osrm_profile() -> &'static str {
    if let Some(profile) = option_env!("OSRM_PROFILE") {
        profile
    } else {
        "driving"
    }
}

const fn osrm_http_proto() -> &'static str {
    if osrm_secure() { "https" } else { "http" }
}

const OSRM_HOST: &str = osrm_host();
const OSRM_PROFILE: &str = osrm_profile();
const OSRM_HTTP_PROTO: &str = osrm_http_proto();

/// Route service base picked at build time from `OSRM_HOST`, `OSRM_SECURE` and `OSRM_PROFILE`
pub const DEFAULT_ROUTE_BASE: &str =
    const_str::concat!(OSRM_HTTP_PROTO, "://", OSRM_HOST, "/route/v1/", OSRM_PROFILE);

/// OSRM wants coordinates as `long,lat`
pub fn route_url(base: &str, start: GeoPoint, end: GeoPoint) -> String {
    format!(
        "{base}/{},{};{},{}?overview=false&steps=true",
        start.long, start.lat, end.long, end.lat
    )
}
