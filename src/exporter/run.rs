//! Export lifecycle -- one run from validated input to finished artifact.

use std::sync::Arc;

use crate::aggregate::{Dataset, export_filename};
use crate::error::{Error, Result};
use crate::progress::{ProgressSubscriber, ProgressTracker};
use crate::resolver::ScheduleResolver;
use crate::types::{DateRange, Event, FlightId};
use crate::worker_pool::run_concurrently;

use super::download_task::{LegDownload, download_leg};
use super::{Artifact, EventingSubscriber, ExportOutcome, ExportRequest, LegMapExporter};

impl LegMapExporter {
    /// Run one export.
    ///
    /// Phases:
    /// 1. Validate input (no range → `Cancelled`, no flights → `InvalidInput`)
    /// 2. Show progress; the indicator is hidden again on every exit path
    /// 3. Resolve flights into leg download tasks
    /// 4. Download all legs with the configured concurrency cap
    /// 5. Aggregate rows and serialize the CSV artifact
    ///
    /// Per-flight and per-leg failures never fail the run; they only reduce the
    /// output. Zero tasks and zero rows are reported as distinct outcomes.
    pub async fn export(
        &self,
        request: &ExportRequest,
        subscriber: Arc<dyn ProgressSubscriber>,
    ) -> Result<ExportOutcome> {
        let range = request.range.ok_or(Error::Cancelled)?;
        if request.flights.is_empty() {
            return Err(Error::InvalidInput(
                "no valid flight numbers provided".into(),
            ));
        }

        let tracker = ProgressTracker::new(Arc::new(EventingSubscriber {
            inner: subscriber,
            event_tx: self.event_tx.clone(),
        }));
        let _progress = tracker.show();

        self.emit(Event::ExportStarted {
            flights: request.flights.clone(),
            range,
        });

        match self.run_export(&request.flights, range, &tracker).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(error = %e, "unexpected error in export flow");
                self.emit(Event::ExportFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_export(
        &self,
        flights: &[FlightId],
        range: DateRange,
        tracker: &ProgressTracker,
    ) -> Result<ExportOutcome> {
        // Phase 3: resolve
        let resolution = ScheduleResolver::new(self.service.as_ref())
            .resolve(flights, range)
            .await;
        for skipped in &resolution.skipped {
            self.emit(Event::FlightSkipped {
                flight: skipped.flight.clone(),
                reason: skipped.reason.to_string(),
            });
        }

        if resolution.tasks.is_empty() {
            tracing::info!("no legs/tasks found to download");
            self.emit(Event::NoTasks);
            return Ok(ExportOutcome::NoTasks);
        }

        // Phase 4: download
        let total = resolution.tasks.len() as u64;
        self.emit(Event::TasksResolved { total });
        tracker.on_start(total);

        let download = &self.config.download;
        let legs: Vec<_> = resolution
            .tasks
            .into_iter()
            .map(|task| {
                download_leg(LegDownload {
                    service: Arc::clone(&self.service),
                    task,
                    jitter_min: download.jitter_min,
                    jitter_max: download.jitter_max,
                    event_tx: self.event_tx.clone(),
                })
            })
            .collect();
        let results = run_concurrently(legs, download.effective_concurrency(), tracker).await;
        let failed = results.iter().filter(|r| r.is_none()).count();

        // Phase 5: aggregate
        let Some(dataset) = Dataset::from_results(results) else {
            tracing::warn!(tasks = total, failed, "no data was downloaded");
            self.emit(Event::NoData);
            return Ok(ExportOutcome::NoData);
        };

        let csv = dataset.to_csv()?;
        let artifact = Artifact {
            filename: export_filename(&self.config.export.base_name, chrono::Utc::now()),
            csv,
            rows: dataset.len(),
            columns: dataset.columns().to_vec(),
        };

        tracing::info!(
            tasks = total,
            failed,
            rows = artifact.rows,
            columns = artifact.columns.len(),
            filename = %artifact.filename,
            "export complete"
        );
        self.emit(Event::ExportComplete {
            rows: artifact.rows,
            columns: artifact.columns.len(),
            filename: artifact.filename.clone(),
        });
        Ok(ExportOutcome::Completed(artifact))
    }
}
