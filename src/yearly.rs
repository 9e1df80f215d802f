//! # Yearly Sun & Tide Tables
//!
//! Whole-year tables for print layout, written as two CSV files:
//!
//! - `Suntimes {YEAR}.csv`: one row per day with sunrise, sunset, daylight
//!   and the change since the day before
//! - `Tides {YEAR}.csv`: every hi/lo prediction of every configured station,
//!   lined up by date, five columns per station
//!
//! Tides are fetched one calendar month per request so no single NOAA call
//! covers the whole year. Months are walked in order and the stations are
//! fetched one after another inside each month.

use crate::config::{Config, StationConfig};
use crate::query::TideQuery;
use crate::renderer::{delta_parts, format_clock, format_daylight};
use crate::solar::{SolarCalculator, SunTimes};
use crate::tide_data::PredictionSource;
use crate::window::enrich;
use crate::{EnrichedEvent, StationId, TideError};
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Columns each station contributes to a tide row.
pub const TIDE_FIELDS: [&str; 5] = ["DATE", "DAY", "TYPE", "HEIGHT", "TIME"];

/// One day of the sun table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct SunRow {
    /// Weekday, `Wed`
    pub day: String,
    /// Month name, `January`
    pub month: String,
    /// Day of the month
    pub date: u32,
    pub sunrise: String,
    pub sunset: String,
    /// Daylight as `H:MM`
    pub dur: String,
    /// Change since the day before as `M:SS`
    pub diff: String,
    #[serde(rename = "MORE/LESS")]
    pub more_less: &'static str,
}

/// One station's tide in a [`TideRow`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TideCell {
    /// `03-07`
    pub date: String,
    /// `Fri`
    pub day: String,
    /// `High` or `Low`
    pub kind: String,
    /// Feet above MLLW to one decimal
    pub height: String,
    /// `08:30 AM`
    pub time: String,
}

impl TideCell {
    fn from_event(event: &EnrichedEvent) -> Self {
        TideCell {
            date: event.time.format("%m-%d").to_string(),
            day: event.time.format("%a").to_string(),
            kind: event.event.tide_type().unwrap_or_default().to_string(),
            height: event
                .event
                .height_ft()
                .map(|ft| format!("{ft:.1}"))
                .unwrap_or_default(),
            time: format_clock(event.time),
        }
    }
}

/// One line of the tide table: the n-th tide of the day at each station.
///
/// A station with fewer tides that day than another leaves its cells empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TideRow {
    pub date: NaiveDate,
    /// One cell per station, in configured order
    pub cells: Vec<Option<TideCell>>,
}

impl TideRow {
    /// Flat CSV record, five fields per station.
    pub fn record(&self) -> Vec<String> {
        self.cells
            .iter()
            .flat_map(|cell| match cell {
                Some(c) => [
                    c.date.clone(),
                    c.day.clone(),
                    c.kind.clone(),
                    c.height.clone(),
                    c.time.clone(),
                ],
                None => Default::default(),
            })
            .collect()
    }
}

/// Both tables for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyTables {
    pub year: i32,
    pub stations: Vec<StationConfig>,
    pub sun: Vec<SunRow>,
    pub tides: Vec<TideRow>,
}

impl YearlyTables {
    /// `Suntimes {YEAR}.csv`
    pub fn sun_file_name(&self) -> String {
        format!("Suntimes {}.csv", self.year)
    }

    /// `Tides {YEAR}.csv`
    pub fn tides_file_name(&self) -> String {
        format!("Tides {}.csv", self.year)
    }

    /// Write the sun table as CSV, header first.
    pub fn write_sun_csv<W: io::Write>(&self, writer: W) -> Result<(), TideError> {
        let mut csv = csv::Writer::from_writer(writer);
        for row in &self.sun {
            csv.serialize(row)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the tide table as CSV, header first.
    pub fn write_tides_csv<W: io::Write>(&self, writer: W) -> Result<(), TideError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(tide_headers(self.stations.len()))?;
        for row in &self.tides {
            csv.write_record(row.record())?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write both files into `dir` and return their paths (sun, tides).
    pub fn save_csv(&self, dir: &Path) -> Result<(PathBuf, PathBuf), TideError> {
        let sun_path = dir.join(self.sun_file_name());
        self.write_sun_csv(File::create(&sun_path)?)?;
        info!(rows = self.sun.len(), "saved {}", sun_path.display());

        let tides_path = dir.join(self.tides_file_name());
        self.write_tides_csv(File::create(&tides_path)?)?;
        info!(rows = self.tides.len(), "saved {}", tides_path.display());

        Ok((sun_path, tides_path))
    }
}

/// `DATE1, DAY1, TYPE1, HEIGHT1, TIME1, DATE2, ...` for `stations` stations.
pub fn tide_headers(stations: usize) -> Vec<String> {
    (1..=stations)
        .flat_map(|n| TIDE_FIELDS.iter().map(move |field| format!("{field}{n}")))
        .collect()
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, TideError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| TideError::InvalidArgument(format!("no month {year}-{month:02}")))
}

/// Last calendar day of `year`-`month`.
pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate, TideError> {
    first_of_month(year, month)?
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| TideError::InvalidArgument(format!("no end to month {year}-{month:02}")))
}

/// Twelve queries for `station`, first to last day of each month of `year`.
pub fn month_spans(station: StationId, year: i32) -> Result<Vec<TideQuery>, TideError> {
    (1..=12)
        .map(|month| {
            TideQuery::new(
                station,
                first_of_month(year, month)?,
                last_day_of_month(year, month)?,
            )
        })
        .collect()
}

/// Every date of `year`, in order.
fn days_of_year(year: i32) -> Result<impl Iterator<Item = NaiveDate>, TideError> {
    Ok(first_of_month(year, 1)?
        .iter_days()
        .take_while(move |d| d.year() == year))
}

/// Sun row for every day of `year`.
///
/// The change is measured against the day before, so 1 January compares
/// with 31 December of the previous year.
pub fn sun_table<T: SunTimes>(sun: &T, year: i32) -> Result<Vec<SunRow>, TideError> {
    let mut rows = Vec::with_capacity(366);
    for date in days_of_year(year)? {
        let sunrise = sun.sunrise(date)?;
        let sunset = sun.sunset(date)?;
        let daylight = sunset - sunrise;

        let yesterday = date
            .pred_opt()
            .ok_or_else(|| TideError::InvalidArgument(format!("no calendar day before {date}")))?;
        let (diff, more_less) = delta_parts(daylight - sun.daylight(yesterday)?);

        rows.push(SunRow {
            day: date.format("%a").to_string(),
            month: date.format("%B").to_string(),
            date: date.day(),
            sunrise: format_clock(sunrise),
            sunset: format_clock(sunset),
            dur: format_daylight(daylight),
            diff,
            more_less,
        });
    }
    Ok(rows)
}

/// Line up each station's events by date.
///
/// For every date of `year`, row *n* holds each station's *n*-th tide of
/// that date. Events outside `year` are left out.
pub fn merge_by_date(year: i32, stations: &[Vec<EnrichedEvent>]) -> Vec<TideRow> {
    let by_date: Vec<BTreeMap<NaiveDate, Vec<&EnrichedEvent>>> = stations
        .iter()
        .map(|events| {
            let mut days: BTreeMap<NaiveDate, Vec<&EnrichedEvent>> = BTreeMap::new();
            for event in events.iter().filter(|e| e.time.year() == year) {
                days.entry(event.time.date()).or_default().push(event);
            }
            days
        })
        .collect();

    let mut dates: Vec<NaiveDate> = by_date.iter().flat_map(|d| d.keys().copied()).collect();
    dates.sort();
    dates.dedup();

    let mut rows = Vec::new();
    for date in dates {
        let day: Vec<&[&EnrichedEvent]> = by_date
            .iter()
            .map(|d| d.get(&date).map(Vec::as_slice).unwrap_or_default())
            .collect();
        let depth = day.iter().map(|events| events.len()).max().unwrap_or(0);

        for n in 0..depth {
            rows.push(TideRow {
                date,
                cells: day
                    .iter()
                    .map(|events| events.get(n).map(|e| TideCell::from_event(e)))
                    .collect(),
            });
        }
    }
    rows
}

/// Builds [`YearlyTables`] from a prediction source and a sun-times provider.
pub struct YearlyBuilder<S, T> {
    source: S,
    sun: T,
    stations: Vec<StationConfig>,
}

impl<S: PredictionSource> YearlyBuilder<S, SolarCalculator> {
    /// Builder for the configured location and stations.
    pub fn from_config(source: S, config: &Config) -> Self {
        YearlyBuilder::new(source, SolarCalculator::from(&config.location), config.stations.clone())
    }
}

impl<S: PredictionSource, T: SunTimes> YearlyBuilder<S, T> {
    pub fn new(source: S, sun: T, stations: Vec<StationConfig>) -> Self {
        Self {
            source,
            sun,
            stations,
        }
    }

    /// Every event of `year` per station, in configured station order.
    ///
    /// Events a source returns outside the requested month are dropped, so
    /// each month contributes only its own days.
    pub async fn fetch_year(&self, year: i32) -> Result<Vec<Vec<EnrichedEvent>>, TideError> {
        let spans = self
            .stations
            .iter()
            .map(|station| month_spans(station.id, year))
            .collect::<Result<Vec<_>, _>>()?;
        let mut events = vec![Vec::new(); self.stations.len()];

        for month in 0..12 {
            info!(year, month = month + 1, "fetching tide predictions");
            for (station_spans, station_events) in spans.iter().zip(events.iter_mut()) {
                let query = &station_spans[month];
                let fetched = enrich(self.source.predictions(query).await?)?;
                let total = fetched.len();
                station_events.extend(fetched.into_iter().filter(|e| {
                    let date = e.time.date();
                    query.begin <= date && date <= query.end
                }));
                debug!(station = %query.station, total, "month fetched");
            }
        }
        Ok(events)
    }

    /// Assemble both tables for `year`.
    pub async fn build(&self, year: i32) -> Result<YearlyTables, TideError> {
        info!(year, stations = self.stations.len(), "building yearly tables");
        let sun = sun_table(&self.sun, year)?;
        let events = self.fetch_year(year).await?;
        let tides = merge_by_date(year, &events);

        info!(year, sun_rows = sun.len(), tide_rows = tides.len(), "yearly tables ready");
        Ok(YearlyTables {
            year,
            stations: self.stations.clone(),
            sun,
            tides,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{event, MockTideSource};
    use crate::window::parse_event_time;
    use crate::PredictionEvent;
    use chrono::{Duration, NaiveDateTime};
    use tempfile::TempDir;

    /// Days a minute shorter each day from a 10-hour day on 2025-01-01.
    struct ShorteningDays;

    impl SunTimes for ShorteningDays {
        fn sunrise(&self, date: NaiveDate) -> Result<NaiveDateTime, TideError> {
            let days = (date - new_year()).num_days();
            Ok(date.and_hms_opt(8, 0, 0).unwrap() + Duration::seconds(30 * days))
        }

        fn sunset(&self, date: NaiveDate) -> Result<NaiveDateTime, TideError> {
            let days = (date - new_year()).num_days();
            Ok(date.and_hms_opt(18, 0, 0).unwrap() - Duration::seconds(30 * days))
        }
    }

    fn new_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn enriched(t: &str, kind: &str, v: &str) -> EnrichedEvent {
        EnrichedEvent {
            event: event(t, kind, v),
            time: parse_event_time(t).unwrap(),
        }
    }

    fn stations() -> Vec<StationConfig> {
        [(9466477, "Bethel, AK"), (9465831, "Quinhagak, AK")]
            .into_iter()
            .map(|(id, name)| StationConfig {
                id: StationId(id),
                name: name.to_string(),
            })
            .collect()
    }

    /// Same list for every month: the source ignores spans.
    fn saved_events() -> Vec<PredictionEvent> {
        vec![
            event("2024-12-31 22:40", "H", "6.0"),
            event("2025-01-01 04:12", "L", "0.45"),
            event("2025-01-01 10:30", "H", "5.96"),
            event("2025-02-28 23:50", "L", "-0.3"),
            event("2025-03-01 06:05", "H", "7.2"),
        ]
    }

    #[test]
    fn test_month_spans_leap_and_common_years() {
        let station = StationId(9466477);
        let spans = month_spans(station, 2024).unwrap();
        assert_eq!(spans.len(), 12);
        assert_eq!(spans[0].begin, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(spans[0].end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(spans[1].end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(spans[3].end, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(spans[11].begin, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(spans[11].end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let spans = month_spans(station, 2025).unwrap();
        let params = spans[1].params("SunTide").unwrap();
        assert!(params.contains(&("begin_date", "20250201".to_string())));
        assert!(params.contains(&("end_date", "20250228".to_string())));
        assert!(spans.iter().all(|q| q.station == station));
    }

    #[test]
    fn test_month_spans_century_leap_rules() {
        assert_eq!(last_day_of_month(1900, 2).unwrap().day(), 28);
        assert_eq!(last_day_of_month(2000, 2).unwrap().day(), 29);
        assert!(matches!(last_day_of_month(2025, 13), Err(TideError::InvalidArgument(_))));
    }

    #[test]
    fn test_tide_headers() {
        assert_eq!(
            tide_headers(2),
            [
                "DATE1", "DAY1", "TYPE1", "HEIGHT1", "TIME1", "DATE2", "DAY2", "TYPE2",
                "HEIGHT2", "TIME2"
            ]
        );
        assert!(tide_headers(0).is_empty());
    }

    #[test]
    fn test_merge_by_date_lines_up_stations() {
        let bethel = vec![
            enriched("2025-01-01 04:12", "L", "0.45"),
            enriched("2025-01-01 10:30", "H", "5.96"),
            enriched("2025-01-03 05:00", "L", "-0.31"),
        ];
        let quinhagak = vec![
            enriched("2025-01-01 03:00", "H", "8.0"),
            enriched("2025-01-02 09:15", "L", "1.04"),
            enriched("2025-01-02 15:45", "H", "9.1"),
            // Next year's first tide is not part of this table
            enriched("2026-01-01 01:00", "H", "9.0"),
        ];

        let rows = merge_by_date(2025, &[bethel, quinhagak]);
        let records: Vec<Vec<String>> = rows.iter().map(TideRow::record).collect();

        assert_eq!(rows.len(), 5);
        assert_eq!(
            records[0],
            ["01-01", "Wed", "Low", "0.5", "04:12 AM", "01-01", "Wed", "High", "8.0", "03:00 AM"]
        );
        assert_eq!(&records[1][..5], ["01-01", "Wed", "High", "6.0", "10:30 AM"]);
        assert_eq!(&records[1][5..], ["", "", "", "", ""]);
        assert_eq!(&records[2][..5], ["", "", "", "", ""]);
        assert_eq!(&records[2][5..], ["01-02", "Thu", "Low", "1.0", "09:15 AM"]);
        assert_eq!(&records[3][5..], ["01-02", "Thu", "High", "9.1", "03:45 PM"]);
        assert_eq!(&records[4][..5], ["01-03", "Fri", "Low", "-0.3", "05:00 AM"]);
        assert!(rows[4].cells[1].is_none());
    }

    #[test]
    fn test_sun_table_has_a_row_per_day() {
        let rows = sun_table(&ShorteningDays, 2025).unwrap();
        assert_eq!(rows.len(), 365);
        assert_eq!(sun_table(&ShorteningDays, 2024).unwrap().len(), 366);

        let first = &rows[0];
        assert_eq!(first.day, "Wed");
        assert_eq!(first.month, "January");
        assert_eq!(first.date, 1);
        assert_eq!(first.sunrise, "08:00 AM");
        assert_eq!(first.sunset, "06:00 PM");
        assert_eq!(first.dur, "10:00");
        assert_eq!(first.diff, "1:00");
        assert_eq!(first.more_less, "less");

        let last = rows.last().unwrap();
        assert_eq!((last.month.as_str(), last.date), ("December", 31));
    }

    #[test]
    fn test_sun_table_tracks_daylight_saving() {
        let config = Config::default();
        let rows = sun_table(&SolarCalculator::from(&config.location), 2025).unwrap();
        // 2025-03-08 is AKST, 2025-03-09 is AKDT: sunrise jumps an hour later
        let (before, after) = (&rows[66], &rows[67]);
        assert_eq!((before.date, after.date), (8, 9));
        assert!(before.sunrise.starts_with("08:"), "{}", before.sunrise);
        assert!(after.sunrise.starts_with("09:"), "{}", after.sunrise);
        assert_eq!(after.more_less, "more");
        assert!(rows[181].sunrise.starts_with("05:2"), "{}", rows[181].sunrise);
    }

    #[tokio::test]
    async fn test_fetch_year_month_by_month() {
        let source = MockTideSource::new()
            .with_predictions(StationId(9466477), saved_events())
            .with_predictions(StationId(9465831), saved_events());
        let builder = YearlyBuilder::new(&source, ShorteningDays, stations());

        let events = builder.fetch_year(2025).await.unwrap();

        let calls = source.calls();
        assert_eq!(calls.len(), 24);
        // Month outer, stations inner
        assert_eq!(calls[0].station, StationId(9466477));
        assert_eq!(calls[1].station, StationId(9465831));
        assert_eq!(calls[2].begin, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(calls[23].end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());

        // Each event once, from the month it belongs to
        let stamps: Vec<_> = events[0].iter().map(|e| e.event.t.as_str()).collect();
        assert_eq!(
            stamps,
            ["2025-01-01 04:12", "2025-01-01 10:30", "2025-02-28 23:50", "2025-03-01 06:05"]
        );
        assert_eq!(events[0], events[1]);
    }

    #[tokio::test]
    async fn test_build_and_write_csv() {
        let source = MockTideSource::new()
            .with_predictions(StationId(9466477), saved_events())
            .with_predictions(StationId(9465831), vec![]);
        let tables = YearlyBuilder::new(&source, ShorteningDays, stations())
            .build(2025)
            .await
            .unwrap();
        assert_eq!(tables.tides.len(), 4);

        let mut sun = Vec::new();
        tables.write_sun_csv(&mut sun).unwrap();
        let sun = String::from_utf8(sun).unwrap();
        let mut lines = sun.lines();
        assert_eq!(lines.next(), Some("DAY,MONTH,DATE,SUNRISE,SUNSET,DUR,DIFF,MORE/LESS"));
        assert_eq!(lines.next(), Some("Wed,January,1,08:00 AM,06:00 PM,10:00,1:00,less"));
        assert_eq!(sun.lines().count(), 366);

        let mut tides = Vec::new();
        tables.write_tides_csv(&mut tides).unwrap();
        let tides = String::from_utf8(tides).unwrap();
        let lines: Vec<_> = tides.lines().collect();
        assert_eq!(lines[0], "DATE1,DAY1,TYPE1,HEIGHT1,TIME1,DATE2,DAY2,TYPE2,HEIGHT2,TIME2");
        assert_eq!(lines[1], "01-01,Wed,Low,0.5,04:12 AM,,,,,");
        assert_eq!(lines[3], "02-28,Fri,Low,-0.3,11:50 PM,,,,,");
        assert_eq!(lines.len(), 5);
    }

    #[tokio::test]
    async fn test_save_csv_names_files_by_year() {
        let source = MockTideSource::new()
            .with_predictions(StationId(9466477), saved_events())
            .with_predictions(StationId(9465831), saved_events());
        let tables = YearlyBuilder::new(&source, ShorteningDays, stations())
            .build(2025)
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let (sun_path, tides_path) = tables.save_csv(dir.path()).unwrap();
        assert_eq!(sun_path, dir.path().join("Suntimes 2025.csv"));
        assert_eq!(tides_path, dir.path().join("Tides 2025.csv"));
        assert!(std::fs::read_to_string(tides_path).unwrap().contains("03-01,Sat,High,7.2"));
    }

    #[tokio::test]
    async fn test_station_failure_aborts_year() {
        let source = MockTideSource::new()
            .with_predictions(StationId(9466477), saved_events())
            .with_failure(StationId(9465831), 503);
        let builder = YearlyBuilder::new(&source, ShorteningDays, stations());

        let err = builder.build(2025).await.unwrap_err();
        assert!(matches!(err, TideError::ApiFailure { status: 503 }));
        assert_eq!(source.calls().len(), 2);
    }
}
