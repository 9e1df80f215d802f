//! # Broadcast Window Selection
//!
//! Picks the tide events worth reading out: the first three high/low events
//! at or after the start of the morning or evening broadcast window.
//!
//! ## Windows
//! | period  | start | end   |
//! |---------|-------|-------|
//! | Morning | 07:08 | 11:08 |
//! | Evening | 18:08 | 22:08 |
//!
//! Both are clock times on the requested calendar day, in the station's
//! local time, the same clock NOAA uses for `lst_ldt` timestamps.
//!
//! ## Window End
//! Only the start bound filters by default, so an evening report can
//! include tomorrow's early-morning low. The end bound is available through
//! [`WindowSelector::enforce_window_end`] but changes what gets reported,
//! so it is opt-in.

use crate::query::TideQuery;
use crate::tide_data::PredictionSource;
use crate::{EnrichedEvent, Period, PredictionEvent, StationId, TideError};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::debug;

/// Most events reported per station
pub const MAX_EVENTS: usize = 3;

/// Minutes after midnight for each window bound
const MORNING_START_MIN: i64 = 7 * 60 + 8;
const MORNING_END_MIN: i64 = 11 * 60 + 8;
const EVENING_START_MIN: i64 = 18 * 60 + 8;
const EVENING_END_MIN: i64 = 22 * 60 + 8;

/// Formats NOAA uses for `t`
const EVENT_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Start and end of a broadcast on a given day. Always `start < end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BroadcastWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

fn clock(minutes_after_midnight: i64) -> NaiveTime {
    NaiveTime::default() + Duration::minutes(minutes_after_midnight)
}

impl BroadcastWindow {
    /// Window for `period` on `date`.
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use suntide_lib::{BroadcastWindow, Period};
    ///
    /// let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    /// let window = BroadcastWindow::new(date, Period::Evening);
    /// assert_eq!(window.start.to_string(), "2025-03-07 18:08:00");
    /// assert_eq!(window.end.to_string(), "2025-03-07 22:08:00");
    /// ```
    pub fn new(date: NaiveDate, period: Period) -> Self {
        let (start, end) = match period {
            Period::Morning => (MORNING_START_MIN, MORNING_END_MIN),
            Period::Evening => (EVENING_START_MIN, EVENING_END_MIN),
        };
        BroadcastWindow {
            start: date.and_time(clock(start)),
            end: date.and_time(clock(end)),
        }
    }

    /// True if `time` falls inside the window, both ends inclusive.
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Query spanning `date` and the following day.
///
/// The second day catches events after midnight that still follow an
/// evening window.
pub fn fetch_span(station: StationId, date: NaiveDate) -> Result<TideQuery, TideError> {
    let next = date
        .succ_opt()
        .ok_or_else(|| TideError::InvalidArgument(format!("no calendar day after {date}")))?;
    TideQuery::new(station, date, next)
}

/// Parse a NOAA event timestamp (`2025-03-07 04:12`).
pub fn parse_event_time(text: &str) -> Result<NaiveDateTime, TideError> {
    let text = text.trim();
    EVENT_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .ok_or_else(|| TideError::MalformedTimestamp(text.to_string()))
}

/// Attach parsed timestamps to raw events, keeping source order.
pub fn enrich(events: Vec<PredictionEvent>) -> Result<Vec<EnrichedEvent>, TideError> {
    events
        .into_iter()
        .map(|event| {
            let time = parse_event_time(&event.t)?;
            Ok(EnrichedEvent { event, time })
        })
        .collect()
}

/// Keep the first [`MAX_EVENTS`] events at or after `window.start`.
///
/// Order is the source order; nothing is re-sorted. With `enforce_end`
/// events after `window.end` are dropped as well. Fewer matches give a
/// shorter result, no matches an empty one.
pub fn select_events(
    events: Vec<PredictionEvent>,
    window: &BroadcastWindow,
    enforce_end: bool,
) -> Result<Vec<EnrichedEvent>, TideError> {
    Ok(enrich(events)?
        .into_iter()
        .filter(|e| {
            if enforce_end {
                window.contains(e.time)
            } else {
                e.time >= window.start
            }
        })
        .take(MAX_EVENTS)
        .collect())
}

/// Fetches a station's predictions and selects the events for a broadcast.
#[derive(Debug, Clone)]
pub struct WindowSelector<S> {
    source: S,
    enforce_window_end: bool,
}

impl<S: PredictionSource> WindowSelector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            enforce_window_end: false,
        }
    }

    /// Also drop events after the window end.
    pub fn enforce_window_end(mut self, enforce: bool) -> Self {
        self.enforce_window_end = enforce;
        self
    }

    /// Up to three events for `station` from the start of `period` on `date`.
    ///
    /// One fetch covering `date` and the next day. A failed fetch aborts the
    /// selection; there is no partial result and no retry.
    pub async fn select_next_tides(
        &self,
        station: StationId,
        date: NaiveDate,
        period: Period,
    ) -> Result<Vec<EnrichedEvent>, TideError> {
        let window = BroadcastWindow::new(date, period);
        let query = fetch_span(station, date)?;

        let events = self.source.predictions(&query).await?;
        let total = events.len();
        let selected = select_events(events, &window, self.enforce_window_end)?;

        debug!(
            %station,
            %period,
            window_start = %window.start,
            fetched = total,
            selected = selected.len(),
            "selected tide events"
        );
        Ok(selected)
    }
}

/// Convenience wrapper for a single selection with the default window policy.
pub async fn select_next_tides<S: PredictionSource>(
    source: &S,
    station: StationId,
    date: NaiveDate,
    period: Period,
) -> Result<Vec<EnrichedEvent>, TideError> {
    WindowSelector::new(source)
        .select_next_tides(station, date, period)
        .await
}
