//! Core types for legmap-dl

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Flat result record: field name to scalar JSON value, in remote field order
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Opaque identifier of one flight (e.g. "00001")
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightId(pub String);

impl FlightId {
    /// Create a new FlightId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FlightId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FlightId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for FlightId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operating date encoded as the integer `YYYYMMDD`
///
/// Integer encoding keeps date comparison a plain integer comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FlightDate(pub u32);

impl FlightDate {
    /// Create a new FlightDate from its integer encoding
    pub fn new(yyyymmdd: u32) -> Self {
        Self(yyyymmdd)
    }

    /// Encode a calendar date
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.year() as u32 * 10_000 + date.month() * 100 + date.day())
    }

    /// Decode into a calendar date, if the encoding names a real day
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt((self.0 / 10_000) as i32, (self.0 / 100) % 100, self.0 % 100)
    }

    /// Get the inner integer value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FlightDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FlightDate {
    type Err = Error;

    /// Accepts `YYYYMMDD` or the date-picker form `YYYY-MM-DD`
    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s.trim().chars().filter(|c| *c != '-').collect();
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!("not a YYYYMMDD date: {s:?}")));
        }
        let value: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidInput(format!("not a YYYYMMDD date: {s:?}")))?;
        let date = FlightDate(value);
        if date.to_naive().is_none() {
            return Err(Error::InvalidInput(format!("no such calendar day: {s:?}")));
        }
        Ok(date)
    }
}

impl<'de> Deserialize<'de> for FlightDate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The schedule service is loose about numbers vs numeric strings
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(FlightDate(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<u32>()
                .map(FlightDate)
                .map_err(|_| serde::de::Error::custom(format!("invalid flight date {s:?}"))),
        }
    }
}

/// Inclusive range of operating dates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: FlightDate,
    end: FlightDate,
}

/// Unchecked wire form of [`DateRange`]
#[derive(Deserialize)]
struct RawDateRange {
    start: FlightDate,
    end: FlightDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = Error;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: FlightDate, end: FlightDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds (`YYYYMMDD` or `YYYY-MM-DD`)
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// First day of the range
    pub fn start(&self) -> FlightDate {
        self.start
    }

    /// Last day of the range
    pub fn end(&self) -> FlightDate {
        self.end
    }

    /// True if `date` lies within the range, both ends inclusive
    pub fn contains(&self, date: FlightDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// One route segment, parsed from a composite `"ORIGIN-DEST"` key
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegId {
    /// Origin station code
    pub origin: String,
    /// Destination station code
    pub destination: String,
}

impl LegId {
    /// Create a new LegId
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    /// Parse a composite key; the first two `-`-separated parts are used
    ///
    /// A key without a separator yields an empty destination.
    pub fn from_key(key: &str) -> Self {
        let mut parts = key.split('-');
        let origin = parts.next().unwrap_or_default();
        let destination = parts.next().unwrap_or_default();
        Self::new(origin, destination)
    }
}

impl std::str::FromStr for LegId {
    type Err = std::convert::Infallible;

    fn from_str(key: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_key(key))
    }
}

impl std::fmt::Display for LegId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

/// Legs of one flight's operation, in remote key order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegMap {
    legs: Vec<(LegId, serde_json::Value)>,
}

impl LegMap {
    /// Build from a `legMapping` JSON object, preserving key order
    pub fn from_mapping(mapping: &serde_json::Map<String, serde_json::Value>) -> Self {
        let legs = mapping
            .iter()
            .map(|(key, meta)| {
                if !key.contains('-') {
                    tracing::warn!(key = %key, "leg key has no ORIGIN-DEST separator");
                }
                (LegId::from_key(key), meta.clone())
            })
            .collect();
        Self { legs }
    }

    /// Build from bare leg ids with empty metadata
    pub fn from_legs(legs: impl IntoIterator<Item = LegId>) -> Self {
        Self {
            legs: legs
                .into_iter()
                .map(|leg| (leg, serde_json::Value::Null))
                .collect(),
        }
    }

    /// Iterate the leg ids in order
    pub fn legs(&self) -> impl Iterator<Item = &LegId> {
        self.legs.iter().map(|(leg, _)| leg)
    }

    /// Metadata the service returned for `leg`
    pub fn metadata(&self, leg: &LegId) -> Option<&serde_json::Value> {
        self.legs.iter().find(|(l, _)| l == leg).map(|(_, meta)| meta)
    }

    /// Number of legs
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    /// True if the map has no legs
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}

/// The atomic unit of concurrent work: one leg of one flight on one date
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    /// Flight the leg belongs to
    pub flight: FlightId,
    /// Operating date
    pub date: FlightDate,
    /// Route segment
    pub leg: LegId,
}

impl std::fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.flight, self.date, self.leg)
    }
}

/// Shared, write-once leg structure of a flight
pub type SharedLegMap = Arc<LegMap>;

/// Snapshot of run progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    /// Tasks that reached a terminal state
    pub completed: u64,
    /// Tasks in the run
    pub total: u64,
}

impl ProgressState {
    /// Completion ratio in `0.0..=1.0` (zero when there are no tasks)
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.completed.min(self.total) as f32 / self.total as f32
        }
    }

    /// Percentage rounded to the nearest integer
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }

    /// Human-readable status line, `None` before any task is known
    pub fn message(&self) -> Option<String> {
        if self.total == 0 {
            None
        } else if self.completed >= self.total {
            Some("Finalizing CSV...".to_string())
        } else {
            Some(format!(
                "{} / {} legs downloaded",
                self.completed, self.total
            ))
        }
    }
}

/// Event emitted by an export run
///
/// Consumers subscribe through [`crate::LegMapExporter::subscribe`].
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run started for the given flights
    ExportStarted {
        /// Flights requested
        flights: Vec<FlightId>,
        /// Date range requested
        range: DateRange,
    },

    /// A flight was dropped during resolution
    FlightSkipped {
        /// Flight that was skipped
        flight: FlightId,
        /// Why it contributed no tasks
        reason: String,
    },

    /// Task list built; execution is about to begin
    TasksResolved {
        /// Number of tasks
        total: u64,
    },

    /// One task reached a terminal state
    TaskCompleted {
        /// Tasks finished so far
        completed: u64,
        /// Tasks in the run
        total: u64,
    },

    /// One task failed and contributes no rows
    TaskFailed {
        /// Task that failed
        task: DownloadTask,
        /// Error message
        error: String,
    },

    /// Artifact produced
    ExportComplete {
        /// Number of data rows
        rows: usize,
        /// Number of unified columns
        columns: usize,
        /// Suggested file name
        filename: String,
    },

    /// No flight produced any task
    NoTasks,

    /// Tasks ran but produced zero rows
    NoData,

    /// Unexpected top-level failure
    ExportFailed {
        /// Error message
        error: String,
    },
}
