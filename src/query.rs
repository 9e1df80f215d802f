//! # NOAA Prediction Queries
//!
//! Builds the request sent to the CO-OPS `datagetter` endpoint. Construction
//! is pure: nothing here touches the network, and every malformed input is
//! rejected with [`TideError::InvalidArgument`] before a request exists.
//!
//! ## Fixed Parameters
//! | parameter   | value         | meaning                                  |
//! |-------------|---------------|------------------------------------------|
//! | `product`   | `predictions` | harmonic tide predictions                |
//! | `datum`     | `MLLW`        | heights above Mean Lower Low Water       |
//! | `interval`  | `hilo`        | only high and low tide events            |
//! | `units`     | `english`     | feet                                     |
//! | `time_zone` | `lst_ldt`     | station local standard/daylight time     |
//! | `format`    | `json`        |                                          |
//!
//! Dates travel as `YYYYMMDD`, taken straight from the calendar fields with
//! no timezone shifting.

use crate::{StationId, TideError};
use chrono::{Datelike, NaiveDate};
use reqwest::Url;

/// Production CO-OPS data API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

/// Client identifier NOAA asks callers to send with every request
pub const DEFAULT_APPLICATION: &str = "SunTide";

const PRODUCT: &str = "predictions";
const DATUM: &str = "MLLW";
const INTERVAL: &str = "hilo";
const UNITS: &str = "english";
const TIME_ZONE: &str = "lst_ldt";
const FORMAT: &str = "json";

/// Format a calendar date as the 8-digit `YYYYMMDD` string NOAA expects.
///
/// Years outside `0000..=9999` cannot be written in 8 digits and are
/// rejected.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use suntide_lib::query::format_date;
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
/// assert_eq!(format_date(&date).unwrap(), "20250307");
/// ```
pub fn format_date<D: Datelike>(date: &D) -> Result<String, TideError> {
    let year = date.year();
    if !(0..=9999).contains(&year) {
        return Err(TideError::InvalidArgument(format!(
            "year {year} cannot be formatted as YYYYMMDD"
        )));
    }
    Ok(format!("{:04}{:02}{:02}", year, date.month(), date.day()))
}

/// Parse caller-supplied date text, either `YYYY-MM-DD` or `YYYYMMDD`.
///
/// Anything that is not a real calendar date (`2025-02-30`, `tomorrow`,
/// an empty string) fails with [`TideError::InvalidArgument`].
pub fn parse_date(text: &str) -> Result<NaiveDate, TideError> {
    let text = text.trim();
    // %Y%m%d on its own accepts short years, so only use it for exactly 8 digits
    let parsed = if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        NaiveDate::parse_from_str(text, "%Y%m%d")
    } else {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
    };
    parsed.map_err(|_| TideError::InvalidArgument(format!("'{text}' is not a valid calendar date")))
}

/// A validated request for hi/lo predictions at one station over a date span.
///
/// Both ends of the span are inclusive. The request itself is a plain GET
/// with no body and no auth headers; see [`TideQuery::url`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TideQuery {
    pub station: StationId,
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl TideQuery {
    /// Create a query, checking that the span is non-empty and formattable.
    pub fn new(station: StationId, begin: NaiveDate, end: NaiveDate) -> Result<Self, TideError> {
        if end < begin {
            return Err(TideError::InvalidArgument(format!(
                "end date {end} is before begin date {begin}"
            )));
        }
        format_date(&begin)?;
        format_date(&end)?;
        Ok(TideQuery {
            station,
            begin,
            end,
        })
    }

    /// Create a query from textual dates (`YYYY-MM-DD` or `YYYYMMDD`).
    pub fn from_text(station: StationId, begin: &str, end: &str) -> Result<Self, TideError> {
        Self::new(station, parse_date(begin)?, parse_date(end)?)
    }

    /// Query parameters in the order NOAA documents them.
    pub fn params(&self, application: &str) -> Result<Vec<(&'static str, String)>, TideError> {
        Ok(vec![
            ("begin_date", format_date(&self.begin)?),
            ("end_date", format_date(&self.end)?),
            ("station", self.station.to_string()),
            ("product", PRODUCT.to_string()),
            ("datum", DATUM.to_string()),
            ("interval", INTERVAL.to_string()),
            ("units", UNITS.to_string()),
            ("time_zone", TIME_ZONE.to_string()),
            ("application", application.to_string()),
            ("format", FORMAT.to_string()),
        ])
    }

    /// Full, URL-encoded request URL against `base_url`.
    ///
    /// # Example
    /// ```
    /// use suntide_lib::query::{TideQuery, DEFAULT_BASE_URL};
    /// use suntide_lib::StationId;
    ///
    /// let query = TideQuery::from_text(StationId(9466477), "2025-03-07", "2025-03-08").unwrap();
    /// let url = query.url(DEFAULT_BASE_URL, "SunTide").unwrap();
    /// assert!(url.as_str().contains("begin_date=20250307"));
    /// assert!(url.as_str().contains("interval=hilo"));
    /// ```
    pub fn url(&self, base_url: &str, application: &str) -> Result<Url, TideError> {
        let params = self.params(application)?;
        Url::parse_with_params(base_url, &params).map_err(|e| {
            TideError::InvalidArgument(format!("invalid NOAA base URL '{base_url}': {e}"))
        })
    }
}
