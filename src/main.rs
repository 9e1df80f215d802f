//! # SunTide Application Entry Point
//!
//! Prints the daily sun and tide report for one date and broadcast period,
//! or with `--year` writes the whole-year sun and tide tables as CSV.
//! Live data comes from NOAA; `--mock-dir` replays saved responses instead.

#[cfg(test)]
mod tests;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use std::env;
use std::path::PathBuf;
use suntide_lib::config::{Config, CONFIG_FILE};
use suntide_lib::mock::MockTideSource;
use suntide_lib::query::parse_date;
use suntide_lib::renderer::render_report;
use suntide_lib::report::ReportBuilder;
use suntide_lib::tide_data::{NoaaClient, PredictionSource};
use suntide_lib::yearly::YearlyBuilder;
use suntide_lib::Period;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: suntide [--morning | --evening] [--date YYYY-MM-DD] [--config PATH]
               [--mock-dir DIR] [--json] [--init-config]
       suntide --year YYYY [--out-dir DIR] [--config PATH] [--mock-dir DIR] [--json]

  --morning        report tides from 07:08 (default)
  --evening        report tides from 18:08
  --date DATE      report date, YYYY-MM-DD or YYYYMMDD (default: today)
  --year YYYY      write 'Suntimes YYYY.csv' and 'Tides YYYY.csv' for the whole year
  --out-dir DIR    directory for the yearly CSV files (default: .)
  --config PATH    configuration file (default: suntide.toml)
  --mock-dir DIR   read saved NOAA responses ({station}.json) instead of the network
  --json           print the report as JSON
  --init-config    write the default configuration to PATH and exit";

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
struct Options {
    period: Period,
    date: Option<NaiveDate>,
    year: Option<i32>,
    out_dir: PathBuf,
    config_path: PathBuf,
    mock_dir: Option<PathBuf>,
    json: bool,
    init_config: bool,
    help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            period: Period::Morning,
            date: None,
            year: None,
            out_dir: PathBuf::from("."),
            config_path: PathBuf::from(CONFIG_FILE),
            mock_dir: None,
            json: false,
            init_config: false,
            help: false,
        }
    }
}

fn parse_args<I>(args: I) -> anyhow::Result<Options>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--morning" => options.period = Period::Morning,
            "--evening" => options.period = Period::Evening,
            "--period" => {
                let value = args.next().context("--period needs a value")?;
                options.period = value.parse()?;
            }
            "--date" => {
                let value = args.next().context("--date needs a value")?;
                options.date = Some(parse_date(&value)?);
            }
            "--year" => {
                let value = args.next().context("--year needs a value")?;
                let year: i32 = value
                    .parse()
                    .with_context(|| format!("invalid year '{value}'"))?;
                anyhow::ensure!((1..=9999).contains(&year), "year {year} out of range");
                options.year = Some(year);
            }
            "--out-dir" => {
                options.out_dir = args.next().context("--out-dir needs a path")?.into();
            }
            "--config" => {
                options.config_path = args.next().context("--config needs a path")?.into();
            }
            "--mock-dir" => {
                options.mock_dir = Some(args.next().context("--mock-dir needs a path")?.into());
            }
            "--json" => options.json = true,
            "--init-config" => options.init_config = true,
            "-h" | "--help" => options.help = true,
            other => anyhow::bail!("unknown argument '{other}'\n\n{USAGE}"),
        }
    }
    Ok(options)
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("suntide=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    init_tracing();

    let options = parse_args(env::args().skip(1))?;
    if options.help {
        println!("{USAGE}");
        return Ok(());
    }

    if options.init_config {
        Config::default()
            .save_to_path(&options.config_path)
            .with_context(|| format!("writing {}", options.config_path.display()))?;
        return Ok(());
    }

    let config = Config::load_from_path(&options.config_path);

    // Create Tokio runtime for the NOAA requests
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match &options.mock_dir {
            Some(dir) => {
                let source = MockTideSource::from_dir(dir)?;
                for station in source.stations() {
                    if config.station_name(station).is_none() {
                        warn!(%station, "saved predictions for a station that is not configured");
                    }
                }
                run(source, &config, &options).await
            }
            None => run(NoaaClient::new(config.noaa.clone())?, &config, &options).await,
        }
    })
}

/// Produce the requested output from `source`.
async fn run<S: PredictionSource>(
    source: S,
    config: &Config,
    options: &Options,
) -> anyhow::Result<()> {
    if let Some(year) = options.year {
        let tables = YearlyBuilder::from_config(source, config)
            .build(year)
            .await
            .with_context(|| format!("building tables for {year}"))?;
        if options.json {
            println!("{}", serde_json::to_string_pretty(&tables)?);
        } else {
            tables
                .save_csv(&options.out_dir)
                .with_context(|| format!("writing CSV files to {}", options.out_dir.display()))?;
        }
        return Ok(());
    }

    let date = options.date.unwrap_or_else(|| Local::now().date_naive());
    let report = ReportBuilder::from_config(source, config)
        .build(date, options.period)
        .await
        .with_context(|| format!("building {} report for {date}", options.period))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report, &config.location.name));
    }
    Ok(())
}
