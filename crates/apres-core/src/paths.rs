//! Endpoint paths, relative to the `/api/` prefix

pub const API_PREFIX: &str = "/api";

pub const SYSTEM_RESET: &str = "system/reset";
pub const HOUSEKEEPING_STATUS: &str = "system/housekeeping/status";
pub const HOUSEKEEPING_CONFIG: &str = "system/housekeeping/config";

pub const RADAR_CONFIG: &str = "radar/config";
pub const RADAR_TRIAL_BURST: &str = "radar/trial-burst";
pub const RADAR_BURST: &str = "radar/burst";
pub const RADAR_RESULTS: &str = "radar/results";

pub const DATA_DIR: &str = "data/dir";
pub const DATA_DOWNLOAD: &str = "data/download";

/// Form field carrying the shared-secret API key on every POST
pub const API_KEY_FIELD: &str = "apikey";

/// Absolute route for a relative endpoint path (`radar/config` -> `/api/radar/config`)
pub fn route(path: &str) -> String {
    format!("{}/{}", API_PREFIX, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route() {
        assert_eq!(route(RADAR_RESULTS), "/api/radar/results");
        assert_eq!(route(HOUSEKEEPING_CONFIG), "/api/system/housekeeping/config");
    }
}
