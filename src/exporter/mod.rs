//! Export orchestration split into focused submodules.
//!
//! - [`run`] - Top-level export lifecycle (validate, resolve, download, aggregate)
//! - [`download_task`] - Single leg download with pre-request jitter

mod download_task;
mod run;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::{HttpService, RemoteService};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::ProgressSubscriber;
use crate::types::{DateRange, Event, FlightId};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main exporter instance
///
/// Cheap to clone; clones share the service client, configuration and event channel.
#[derive(Clone)]
pub struct LegMapExporter {
    /// Remote service used for every lookup
    pub(crate) service: Arc<dyn RemoteService>,
    /// Configuration (wrapped in Arc for sharing with download tasks)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl LegMapExporter {
    /// Create an exporter talking HTTP to the configured service
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let service = HttpService::new(&config.service)?;
        Ok(Self::with_service(config, Arc::new(service)))
    }

    /// Create an exporter around an existing [`RemoteService`]
    pub fn with_service(config: Config, service: Arc<dyn RemoteService>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            config: Arc::new(config),
            event_tx,
        }
    }

    /// Subscribe to export events
    ///
    /// Events are buffered per subscriber; a slow subscriber that falls more than
    /// the channel capacity behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write `artifact` into the configured output directory
    pub async fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        artifact.write_to(&self.config.export.output_dir).await
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is not an error
        self.event_tx.send(event).ok();
    }
}

/// Input supplied by the UI collaborator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    /// Flights to export, in the order given
    pub flights: Vec<FlightId>,
    /// Inclusive date range; `None` means the user declined to choose one
    pub range: Option<DateRange>,
}

impl ExportRequest {
    /// Build a request from free-form text like `"00001, 00005"`.
    ///
    /// Entries are trimmed and empty entries dropped. Empty text or a missing
    /// range means the user backed out ([`Error::Cancelled`]); text that holds no
    /// flight after trimming is [`Error::InvalidInput`].
    pub fn from_input(flights: &str, range: Option<DateRange>) -> Result<Self> {
        if flights.is_empty() || range.is_none() {
            return Err(Error::Cancelled);
        }
        let flights = parse_flight_list(flights);
        if flights.is_empty() {
            return Err(Error::InvalidInput("no valid flight numbers provided".into()));
        }
        Ok(Self { flights, range })
    }
}

/// Split comma-delimited text into trimmed, non-empty flight ids
pub fn parse_flight_list(text: &str) -> Vec<FlightId> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(FlightId::from)
        .collect()
}

/// Finished CSV ready for delivery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Suggested file name (`<base>-<timestamp>.csv`)
    pub filename: String,
    /// CSV text, header first
    pub csv: String,
    /// Number of data rows
    pub rows: usize,
    /// Unified columns
    pub columns: Vec<String>,
}

impl Artifact {
    /// Write the CSV into `dir` (created if missing); returns the file path
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, self.csv.as_bytes()).await?;
        tracing::info!(path = %path.display(), rows = self.rows, "artifact written");
        Ok(path)
    }
}

/// How an export run ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Rows were downloaded and serialized
    Completed(Artifact),
    /// No flight produced any task (no legs found)
    NoTasks,
    /// Tasks ran but none produced a row
    NoData,
}

/// Subscriber wrapper that mirrors progress updates onto the event channel
pub(crate) struct EventingSubscriber {
    pub(crate) inner: Arc<dyn ProgressSubscriber>,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl ProgressSubscriber for EventingSubscriber {
    fn show(&self) {
        self.inner.show();
    }

    fn hide(&self) {
        self.inner.hide();
    }

    fn update(&self, completed: u64, total: u64) {
        self.inner.update(completed, total);
        if completed > 0 {
            self.event_tx
                .send(Event::TaskCompleted { completed, total })
                .ok();
        }
    }
}
