//! # Report Rendering
//!
//! Plain-text rendering of a [`DailyReport`] for the terminal or for reading
//! out on air. Clock times are 12-hour (`08:30 AM`), heights are feet above
//! MLLW to one decimal, daylight is `H:MM` and the day-over-day change is
//! `M:SS more` / `M:SS less`.

use crate::report::{DailyReport, StationTides};
use crate::EnrichedEvent;
use chrono::{Duration, NaiveDateTime};
use std::fmt;

/// Render `report` for `location` as multi-line text.
pub fn render_report(report: &DailyReport, location: &str) -> String {
    ReportText { report, location }.to_string()
}

/// [`fmt::Display`] adapter for a report.
pub struct ReportText<'a> {
    pub report: &'a DailyReport,
    pub location: &'a str,
}

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f, "SunTide: {}", self.location)?;
        writeln!(
            f,
            "{} ({})",
            report.date.format("%A, %B %-d %Y"),
            report.period
        )?;
        writeln!(f)?;
        writeln!(f, "  Sunrise   {}", format_clock(report.sunrise))?;
        writeln!(f, "  Sunset    {}", format_clock(report.sunset))?;
        writeln!(f, "  Daylight  {}", format_daylight(report.daylight))?;
        writeln!(f, "  Change    {}", format_delta(report.daylight_delta))?;

        for station in &report.tides {
            writeln!(f)?;
            write_station(f, station, report)?;
        }
        Ok(())
    }
}

fn write_station(
    f: &mut fmt::Formatter<'_>,
    station: &StationTides,
    report: &DailyReport,
) -> fmt::Result {
    writeln!(f, "{} ({})", station.name, station.station)?;
    if station.events.is_empty() {
        let period = report.period.to_string().to_lowercase();
        return writeln!(f, "  no tides after {period} start");
    }
    for event in &station.events {
        writeln!(f, "  {}", format_tide(event, report))?;
    }
    Ok(())
}

/// `High  9.9 ft  08:30 AM`, with the date added when the tide falls on
/// another day than the report.
pub fn format_tide(event: &EnrichedEvent, report: &DailyReport) -> String {
    let kind = event.event.tide_type().unwrap_or("Tide");
    let height = match event.event.height_ft() {
        Some(ft) => format!("{:>5.1} ft", ft),
        None => "    ? ft".to_string(),
    };
    let when = if event.time.date() == report.date {
        format_clock(event.time)
    } else {
        format!("{} {}", event.time.format("%a %m-%d"), format_clock(event.time))
    };
    format!("{:<4} {}  {}", kind, height, when)
}

/// 12-hour clock time, e.g. `07:28 PM`.
pub fn format_clock(time: NaiveDateTime) -> String {
    time.format("%I:%M %p").to_string()
}

/// Daylight length as `H:MM`.
pub fn format_daylight(daylight: Duration) -> String {
    let minutes = daylight.num_minutes();
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Day-over-day change as `M:SS more` or `M:SS less`.
pub fn format_delta(delta: Duration) -> String {
    let (amount, direction) = delta_parts(delta);
    format!("{amount} {direction}")
}

/// Size of the change as `M:SS`, and `"more"` or `"less"`.
pub fn delta_parts(delta: Duration) -> (String, &'static str) {
    let direction = if delta < Duration::zero() { "less" } else { "more" };
    let seconds = delta.num_seconds().abs();
    (format!("{}:{:02}", seconds / 60, seconds % 60), direction)
}
