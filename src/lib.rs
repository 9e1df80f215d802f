//! # SunTide Core Library
//!
//! This library turns NOAA CO-OPS tide predictions into a short daily report:
//! the next high/low tides at a handful of stations from the start of a
//! morning or evening broadcast window, alongside sunrise, sunset and how
//! much daylight was gained or lost since yesterday.
//!
//! ## Data Flow
//! 1. **Query**: station + date span → [`query::TideQuery`] (`YYYYMMDD`, MLLW, hi/lo, JSON)
//! 2. **Fetch**: [`tide_data::NoaaClient`] issues one GET per station and extracts `predictions`
//! 3. **Select**: [`window::select_events`] keeps the first three events at or after the window start
//! 4. **Aggregate**: [`report::ReportBuilder`] repeats this per station and adds the sun times
//!
//! [`yearly::YearlyBuilder`] covers a whole calendar year instead: one sun
//! row per day and every tide, fetched a month at a time, written as CSV.
//!
//! Everything is request-scoped: nothing is cached and nothing is shared
//! between calls, so the same inputs against the same NOAA data always give
//! the same report.
//!
//! ## Core Types
//! - [`StationId`]: numeric NOAA station identifier
//! - [`Period`]: morning or evening broadcast
//! - [`PredictionEvent`]: one raw hi/lo record exactly as NOAA sent it
//! - [`EnrichedEvent`]: a [`PredictionEvent`] with its timestamp parsed

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod mock;
pub mod query;
pub mod renderer;
pub mod report;
pub mod solar;
pub mod tide_data;
pub mod window;
pub mod yearly;

pub use tide_data::TideError;
pub use window::BroadcastWindow;

/// NOAA tide station identifier (e.g. `9466477` for Bethel, AK).
///
/// Opaque apart from being numeric; it only ever travels to NOAA as a string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u32);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StationId {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(StationId)
            .map_err(|_| TideError::InvalidArgument(format!("'{s}' is not a numeric station id")))
    }
}

/// Broadcast period the report is read out in.
///
/// The discriminants are the wire values callers pass in (`0` morning,
/// `1` evening); anything else is rejected by [`Period::try_from`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Period {
    Morning = 0,
    Evening = 1,
}

impl TryFrom<u8> for Period {
    type Error = TideError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Period::Morning),
            1 => Ok(Period::Evening),
            other => Err(TideError::InvalidArgument(format!(
                "period must be 0 (morning) or 1 (evening), got {other}"
            ))),
        }
    }
}

impl FromStr for Period {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" | "am" | "0" => Ok(Period::Morning),
            "evening" | "pm" | "1" => Ok(Period::Evening),
            _ => Err(TideError::InvalidArgument(format!(
                "unknown period '{s}', expected morning or evening"
            ))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Morning => write!(f, "Morning"),
            Period::Evening => write!(f, "Evening"),
        }
    }
}

/// One high/low tide record as returned by NOAA.
///
/// Only the timestamp `t` is interpreted (`"2025-03-07 04:12"`, station
/// local time). Everything else, typically `v` (height) and `type`
/// (`H`/`L`), is kept verbatim in `payload` and passed through unmodified.
///
/// # Example
/// ```
/// use suntide_lib::PredictionEvent;
///
/// let event: PredictionEvent =
///     serde_json::from_str(r#"{"t":"2025-03-07 04:12","v":"5.123","type":"H"}"#).unwrap();
/// assert_eq!(event.t, "2025-03-07 04:12");
/// assert_eq!(event.tide_type(), Some("High"));
/// assert_eq!(event.height_ft(), Some(5.123));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionEvent {
    /// Event timestamp, textual, station local standard/daylight time
    pub t: String,
    /// Tide type/height fields, untouched
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl PredictionEvent {
    /// Human-readable tide type from the `type` field (`H` → High, `L` → Low).
    pub fn tide_type(&self) -> Option<&'static str> {
        match self.payload.get("type").and_then(Value::as_str)? {
            "H" | "HH" => Some("High"),
            "L" | "LL" => Some("Low"),
            _ => None,
        }
    }

    /// Predicted height in feet above MLLW, parsed from the `v` field.
    ///
    /// NOAA sends heights as strings; a bare number is accepted as well.
    pub fn height_ft(&self) -> Option<f64> {
        match self.payload.get("v")? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

/// A [`PredictionEvent`] together with its parsed timestamp.
///
/// Built fresh for every selection and never stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: PredictionEvent,
    /// Parsed form of `event.t`
    pub time: NaiveDateTime,
}
