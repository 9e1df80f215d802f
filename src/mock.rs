//! Mock prediction source for running without NOAA access.
//!
//! Serves saved `datagetter` responses (or in-memory events) as if they were
//! live API answers, and can simulate a failing station.

use crate::query::TideQuery;
use crate::tide_data::{decode_predictions, PredictionSource};
use crate::{PredictionEvent, StationId, TideError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum MockResponse {
    Predictions(Vec<PredictionEvent>),
    Status(u16),
}

/// Prediction source backed by fixed data.
///
/// Date spans are ignored: a station always gets the same events back.
/// Every query is recorded so callers can check what would have been sent.
#[derive(Debug, Default)]
pub struct MockTideSource {
    responses: HashMap<StationId, MockResponse>,
    calls: Mutex<Vec<TideQuery>>,
}

impl MockTideSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load saved NOAA responses from a directory.
    ///
    /// Expects files named `{station}.json` (e.g. `9466477.json`) holding a
    /// raw `datagetter` response body. Other files are skipped.
    pub fn from_dir(data_dir: impl AsRef<Path>) -> Result<Self, TideError> {
        let data_dir = data_dir.as_ref();
        let mut source = Self::new();

        for entry in fs::read_dir(data_dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let station: StationId = stem.parse()?;
            let predictions = decode_predictions(&fs::read(&path)?)?;
            source = source.with_predictions(station, predictions);
        }

        if source.responses.is_empty() {
            return Err(TideError::InvalidArgument(format!(
                "no saved predictions found in {}",
                data_dir.display()
            )));
        }
        Ok(source)
    }

    /// Serve `events` for `station`.
    pub fn with_predictions(mut self, station: StationId, events: Vec<PredictionEvent>) -> Self {
        self.responses
            .insert(station, MockResponse::Predictions(events));
        self
    }

    /// Answer every query for `station` with a non-success HTTP status.
    pub fn with_failure(mut self, station: StationId, status: u16) -> Self {
        self.responses.insert(station, MockResponse::Status(status));
        self
    }

    /// Stations with mock data, sorted.
    pub fn stations(&self) -> Vec<StationId> {
        let mut stations: Vec<_> = self.responses.keys().copied().collect();
        stations.sort();
        stations
    }

    /// Queries received so far, oldest first.
    pub fn calls(&self) -> Vec<TideQuery> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl PredictionSource for MockTideSource {
    async fn predictions(&self, query: &TideQuery) -> Result<Vec<PredictionEvent>, TideError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query.clone());

        match self.responses.get(&query.station) {
            Some(MockResponse::Predictions(events)) => Ok(events.clone()),
            Some(MockResponse::Status(status)) => Err(TideError::ApiFailure { status: *status }),
            None => Err(TideError::ApiFailure { status: 404 }),
        }
    }
}

/// Build a prediction record shaped like NOAA's (`t`, `v`, `type`).
pub fn event(t: &str, tide_type: &str, height_ft: &str) -> PredictionEvent {
    let mut payload = Map::new();
    payload.insert("v".to_string(), Value::String(height_ft.to_string()));
    payload.insert("type".to_string(), Value::String(tide_type.to_string()));
    PredictionEvent {
        t: t.to_string(),
        payload,
    }
}
