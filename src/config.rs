//! Process configuration, read from CLI flags or the environment (a `.env`
//! file is loaded first by the binary).

use clap::Args;
use std::time::Duration;

use crate::error::ConfigError;
use crate::infra::onebusaway::DEFAULT_BASE_URL;
use crate::render::{MarkerStyle, RenderConfig};

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// OneBusAway API key
    #[arg(long, env = "ONEBUSAWAY_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// OneBusAway server base URL
    #[arg(long, env = "ONEBUSAWAY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Map center latitude
    #[arg(long, env = "MAP_CENTER_LAT", default_value_t = 47.609941, allow_negative_numbers = true)]
    pub center_lat: f64,

    /// Map center longitude
    #[arg(long, env = "MAP_CENTER_LON", default_value_t = -122.257517, allow_negative_numbers = true)]
    pub center_lon: f64,

    /// Routes to track, in display order
    #[arg(
        long,
        env = "ROUTE_IDS",
        value_delimiter = ',',
        default_value = "40_100479,40_2LINE,1_100146"
    )]
    pub route_ids: Vec<String>,

    /// Seconds between refreshes, server-side and in the browser
    #[arg(long, env = "UPDATE_INTERVAL", default_value_t = 60)]
    pub update_interval: u64,

    /// Initial map zoom level
    #[arg(long, env = "DEFAULT_ZOOM", default_value_t = 12)]
    pub default_zoom: u8,

    /// Seconds before a route's fetch is abandoned
    #[arg(long, env = "FETCH_TIMEOUT", default_value_t = 15)]
    pub fetch_timeout: u64,

    /// Address the HTTP server listens on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen: String,
}

impl Config {
    /// Checks the values that cannot be expressed as clap constraints.
    /// Route ids are trimmed in place.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        for route in &mut self.route_ids {
            *route = route.trim().to_string();
        }
        if self.route_ids.is_empty() {
            return Err(ConfigError::NoRoutes);
        }
        if let Some(index) = self.route_ids.iter().position(|r| r.is_empty()) {
            return Err(ConfigError::BlankRoute { index });
        }
        if self.update_interval == 0 {
            return Err(invalid("update_interval", "must be at least 1 second"));
        }
        if self.fetch_timeout == 0 {
            return Err(invalid("fetch_timeout", "must be at least 1 second"));
        }
        if !(-90.0..=90.0).contains(&self.center_lat) {
            return Err(invalid("center_lat", "must be within -90..=90"));
        }
        if !(-180.0..=180.0).contains(&self.center_lon) {
            return Err(invalid("center_lon", "must be within -180..=180"));
        }
        if self.default_zoom > 19 {
            return Err(invalid("default_zoom", "must be within 0..=19"));
        }
        if self.api_key.trim().is_empty() {
            return Err(invalid("api_key", "must not be empty"));
        }
        Ok(())
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            center: (self.center_lat, self.center_lon),
            zoom: self.default_zoom,
            refresh_interval: self.update_interval,
            style: MarkerStyle::default(),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}
