//! # NOAA Tide Prediction Fetching
//!
//! Network side of the pipeline: one HTTP GET per [`TideQuery`] against the
//! NOAA CO-OPS data API, returning the `predictions` array untouched.
//!
//! ## Data Source
//! - **URL**: `https://api.tidesandcurrents.noaa.gov/api/prod/datagetter`
//! - **Format**: JSON, `{"predictions": [{"t": "2025-03-07 04:12", "v": "5.123", "type": "H"}, ...]}`
//! - **Docs**: <https://api.tidesandcurrents.noaa.gov/api/prod/>
//!
//! ## Error Handling
//! Nothing is retried and nothing is recovered locally:
//! - **Non-success status**: [`TideError::ApiFailure`] with the status code
//! - **Transport failure / timeout**: [`TideError::Http`]
//! - **Body is not JSON**: [`TideError::Decode`]
//! - **No `predictions` field**: empty sequence (NOAA reports bad stations
//!   this way, with an `error` object and a 200 status)
//!
//! Timeouts come from the client configuration ([`NoaaConfig::timeout_secs`]).

use crate::config::NoaaConfig;
use crate::query::TideQuery;
use crate::PredictionEvent;
use chrono::NaiveDate;
use serde::Deserialize;
use std::{io, time::Duration};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Everything that can go wrong between a caller's arguments and a report.
#[derive(Error, Debug)]
pub enum TideError {
    /// Malformed date, period, station or span; raised before any request
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// NOAA answered with a non-success HTTP status
    #[error("unable to retrieve data from API (HTTP {status})")]
    ApiFailure { status: u16 },

    /// Request never completed (DNS, connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("JSON decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// A prediction carried a timestamp that is not `YYYY-MM-DD HH:MM`
    #[error("malformed prediction timestamp '{0}'")]
    MalformedTimestamp(String),

    /// The sun does not rise or set on this date at this latitude
    #[error("no {event} on {date} at this latitude")]
    NoSolarEvent { date: NaiveDate, event: &'static str },

    /// Writing a yearly table failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading saved predictions from disk failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Anything that can answer a [`TideQuery`] with raw prediction events.
///
/// Implemented by [`NoaaClient`] for the live API and by
/// [`crate::mock::MockTideSource`] for saved data and tests. Events must be
/// returned in the order the source produced them.
#[allow(async_fn_in_trait)]
pub trait PredictionSource {
    async fn predictions(&self, query: &TideQuery) -> Result<Vec<PredictionEvent>, TideError>;
}

impl<S: PredictionSource> PredictionSource for &S {
    async fn predictions(&self, query: &TideQuery) -> Result<Vec<PredictionEvent>, TideError> {
        (**self).predictions(query).await
    }
}

/// Top-level shape of a `datagetter` response.
#[derive(Debug, Deserialize)]
struct PredictionsResponse {
    #[serde(default)]
    predictions: Option<Vec<PredictionEvent>>,
    #[serde(default)]
    error: Option<NoaaErrorBody>,
}

#[derive(Debug, Deserialize)]
struct NoaaErrorBody {
    #[serde(default)]
    message: String,
}

/// Decode a `datagetter` response body into its `predictions`.
///
/// A missing `predictions` field yields an empty sequence; NOAA's own error
/// message, if present, is logged.
pub fn decode_predictions(body: &[u8]) -> Result<Vec<PredictionEvent>, TideError> {
    let response: PredictionsResponse = serde_json::from_slice(body)?;
    match response.predictions {
        Some(predictions) => Ok(predictions),
        None => {
            match response.error {
                Some(error) => warn!(message = %error.message, "NOAA returned no predictions"),
                None => warn!("NOAA response has no predictions field"),
            }
            Ok(Vec::new())
        }
    }
}

/// Async client for the NOAA CO-OPS prediction API.
#[derive(Debug, Clone)]
pub struct NoaaClient {
    http: reqwest::Client,
    config: NoaaConfig,
}

impl NoaaClient {
    /// Build a client with the configured timeout.
    pub fn new(config: NoaaConfig) -> Result<Self, TideError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("suntide/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    /// Issue one GET for `query` and return the raw prediction events.
    pub async fn fetch_predictions(
        &self,
        query: &TideQuery,
    ) -> Result<Vec<PredictionEvent>, TideError> {
        let url = query.url(&self.config.base_url, &self.config.application)?;
        info!(
            station = %query.station,
            begin = %query.begin,
            end = %query.end,
            "fetching NOAA predictions"
        );
        debug!(%url, "NOAA request");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(station = %query.station, status = status.as_u16(), "NOAA request failed");
            return Err(TideError::ApiFailure {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let predictions = decode_predictions(&body)?;
        debug!(station = %query.station, count = predictions.len(), "decoded predictions");
        Ok(predictions)
    }
}

impl PredictionSource for NoaaClient {
    async fn predictions(&self, query: &TideQuery) -> Result<Vec<PredictionEvent>, TideError> {
        self.fetch_predictions(query).await
    }
}
