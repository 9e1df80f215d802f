//! # Daily Sun & Tide Report
//!
//! Combines sunrise/sunset for the observer with the broadcast-window tides
//! of every configured station.
//!
//! Stations are fetched one after another in configured order. The first
//! failure aborts the whole report: a report with a station silently missing
//! would read exactly like a station with no tides.

use crate::config::{Config, StationConfig};
use crate::solar::{SolarCalculator, SunTimes};
use crate::tide_data::PredictionSource;
use crate::window::WindowSelector;
use crate::{EnrichedEvent, Period, StationId, TideError};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use tracing::info;

/// Tide events selected for one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTides {
    pub station: StationId,
    pub name: String,
    pub events: Vec<EnrichedEvent>,
}

/// Everything read out for one date and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub period: Period,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    /// Sunset minus sunrise
    #[serde(serialize_with = "as_seconds")]
    pub daylight: Duration,
    /// Today's daylight minus yesterday's; negative when days are shortening
    #[serde(serialize_with = "as_seconds")]
    pub daylight_delta: Duration,
    /// One entry per station, in configured order
    pub tides: Vec<StationTides>,
}

impl DailyReport {
    /// Selected events for `station`, if it is part of the report.
    pub fn tides_for(&self, station: StationId) -> Option<&[EnrichedEvent]> {
        self.tides
            .iter()
            .find(|t| t.station == station)
            .map(|t| t.events.as_slice())
    }
}

fn as_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_seconds())
}

/// Builds [`DailyReport`]s from a prediction source and a sun-times provider.
pub struct ReportBuilder<S, T> {
    selector: WindowSelector<S>,
    sun: T,
    stations: Vec<StationConfig>,
}

impl<S: PredictionSource> ReportBuilder<S, SolarCalculator> {
    /// Builder for the configured location, stations and window policy.
    pub fn from_config(source: S, config: &Config) -> Self {
        ReportBuilder::new(source, SolarCalculator::from(&config.location), config.stations.clone())
            .enforce_window_end(config.report.enforce_window_end)
    }
}

impl<S: PredictionSource, T: SunTimes> ReportBuilder<S, T> {
    pub fn new(source: S, sun: T, stations: Vec<StationConfig>) -> Self {
        Self {
            selector: WindowSelector::new(source),
            sun,
            stations,
        }
    }

    /// Also drop tide events after the broadcast window end.
    pub fn enforce_window_end(mut self, enforce: bool) -> Self {
        self.selector = self.selector.enforce_window_end(enforce);
        self
    }

    /// Assemble the report for `date` and `period`.
    pub async fn build(&self, date: NaiveDate, period: Period) -> Result<DailyReport, TideError> {
        info!(%date, %period, stations = self.stations.len(), "building daily report");

        let sunrise = self.sun.sunrise(date)?;
        let sunset = self.sun.sunset(date)?;
        let daylight = sunset - sunrise;

        let yesterday = date
            .pred_opt()
            .ok_or_else(|| TideError::InvalidArgument(format!("no calendar day before {date}")))?;
        let daylight_delta = daylight - self.sun.daylight(yesterday)?;

        let mut tides = Vec::with_capacity(self.stations.len());
        for station in &self.stations {
            let events = self
                .selector
                .select_next_tides(station.id, date, period)
                .await?;
            tides.push(StationTides {
                station: station.id,
                name: station.name.clone(),
                events,
            });
        }

        info!(
            %date,
            daylight_min = daylight.num_minutes(),
            delta_sec = daylight_delta.num_seconds(),
            "daily report ready"
        );
        Ok(DailyReport {
            date,
            period,
            sunrise,
            sunset,
            daylight,
            daylight_delta,
            tides,
        })
    }
}
