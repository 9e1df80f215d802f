//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the suntide.toml file.
//! It provides a centralized way to configure the observer location used for
//! sunrise/sunset, the NOAA endpoint, and the list of tide stations reported on.

use crate::query::{DEFAULT_APPLICATION, DEFAULT_BASE_URL};
use crate::{StationId, TideError};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "suntide.toml";

/// Application configuration loaded from suntide.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Where sunrise and sunset are computed for
    pub location: LocationConfig,
    /// NOAA CO-OPS API settings
    #[serde(default)]
    pub noaa: NoaaConfig,
    /// Tide stations included in the report, in report order
    pub stations: Vec<StationConfig>,
    /// Report options
    #[serde(default)]
    pub report: ReportConfig,
}

/// Observer location for the solar calculation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Human-readable place name for the report header
    pub name: String,
    /// Latitude in degrees, north positive
    pub latitude: f64,
    /// Longitude in degrees, east positive
    pub longitude: f64,
    /// IANA time zone for sunrise/sunset, matching NOAA's `lst_ldt` tide
    /// times (standard time in winter, daylight time in summer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<Tz>,
    /// Fixed offset from UTC in hours; overrides `timezone` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_hours: Option<f64>,
}

/// NOAA CO-OPS endpoint configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NoaaConfig {
    /// `datagetter` endpoint URL
    pub base_url: String,
    /// Client identifier sent as the `application` parameter
    pub application: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

/// One NOAA tide station
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StationConfig {
    /// NOAA station ID (e.g. 9466477 for Bethel, AK)
    pub id: StationId,
    /// Human-readable station name for reference
    pub name: String,
}

/// Report behaviour
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Drop tide events after the broadcast window end.
    /// Default false reports the first three events at or after the window
    /// start, wherever they fall.
    #[serde(default)]
    pub enforce_window_end: bool,
}

impl Default for NoaaConfig {
    fn default() -> Self {
        NoaaConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            application: DEFAULT_APPLICATION.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                name: "Bethel, AK".to_string(),
                latitude: 60.48,
                longitude: -161.46,
                timezone: Some(chrono_tz::America::Anchorage),
                utc_offset_hours: None,
            },
            noaa: NoaaConfig::default(),
            stations: vec![
                StationConfig {
                    id: StationId(9466477),
                    name: "Bethel, AK".to_string(),
                },
                StationConfig {
                    id: StationId(9465831),
                    name: "Quinhagak, AK".to_string(),
                },
                StationConfig {
                    id: StationId(8467373),
                    name: "Togiak, AK".to_string(),
                },
            ],
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        location = %config.location.name,
                        stations = config.stations.len(),
                        "loaded configuration from {}",
                        path.display()
                    );
                    config
                }
                Err(e) => {
                    warn!("invalid config file {}: {}", path.display(), e);
                    warn!("using default configuration (Bethel, AK)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "no config file at {}, using default configuration (Bethel, AK)",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Station IDs in report order
    pub fn station_ids(&self) -> Vec<StationId> {
        self.stations.iter().map(|s| s.id).collect()
    }

    /// Display name for a station, if configured
    pub fn station_name(&self, id: StationId) -> Option<&str> {
        self.stations
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.as_str())
    }

    /// Save current configuration to `path` as pretty TOML
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TideError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| TideError::InvalidArgument(format!("config not serializable: {e}")))?;
        fs::write(path.as_ref(), contents)?;
        info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}
