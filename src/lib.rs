//! # legmap-dl
//!
//! Bulk export of ODIF leg-map data for a list of flights over a date range.
//!
//! ## Design Philosophy
//!
//! legmap-dl is designed to be:
//! - **Isolated** - A failing flight or leg never fails the whole export
//! - **Polite** - Bounded concurrency plus random jitter before every leg request
//! - **Library-first** - No UI; a host supplies input and a progress subscriber
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Pipeline
//!
//! 1. [`ScheduleResolver`] expands flights into per-leg [`DownloadTask`]s,
//!    fetching each flight's leg structure once
//! 2. [`run_concurrently`] downloads every leg with a concurrency cap, advancing a
//!    [`ProgressTracker`]
//! 3. [`Dataset`] unifies the columns of all rows and serializes them to CSV
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use legmap_dl::{Config, DateRange, ExportOutcome, ExportRequest, LegMapExporter, NoopSubscriber};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = LegMapExporter::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = exporter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let range = DateRange::parse("2025-01-01", "2025-01-31")?;
//!     let request = ExportRequest::from_input("00001, 00005", Some(range))?;
//!     if let ExportOutcome::Completed(artifact) =
//!         exporter.export(&request, Arc::new(NoopSubscriber)).await?
//!     {
//!         exporter.save(&artifact).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Result aggregation and CSV serialization
pub mod aggregate;
/// Remote service client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export orchestration (decomposed into focused submodules)
pub mod exporter;
/// Progress tracking
pub mod progress;
/// Flight schedule to leg task resolution
pub mod resolver;
/// Core types and events
pub mod types;
/// Bounded-concurrency task runner
pub mod worker_pool;

// Re-export commonly used types
pub use aggregate::{Dataset, export_filename};
pub use client::{HttpService, RemoteService};
pub use config::{Config, DownloadConfig, ExportConfig, ServiceConfig};
pub use error::{Error, Result};
pub use exporter::{Artifact, ExportOutcome, ExportRequest, LegMapExporter, parse_flight_list};
pub use progress::{NoopSubscriber, ProgressGuard, ProgressSubscriber, ProgressTracker};
pub use resolver::{LegMapCache, Resolution, ScheduleResolver, SkipReason, SkippedFlight};
pub use types::{
    DateRange, DownloadTask, Event, FlightDate, FlightId, LegId, LegMap, ProgressState, Record,
    SharedLegMap,
};
pub use worker_pool::run_concurrently;
