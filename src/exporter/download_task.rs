//! Single leg download -- jitter delay, detail lookup, failure reporting.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{RemoteService, jitter_delay};
use crate::error::Result;
use crate::types::{DownloadTask, Event, Record};

/// Everything a leg download needs, owned so the future is `'static`
pub(super) struct LegDownload {
    pub(super) service: Arc<dyn RemoteService>,
    pub(super) task: DownloadTask,
    pub(super) jitter_min: Duration,
    pub(super) jitter_max: Duration,
    pub(super) event_tx: tokio::sync::broadcast::Sender<Event>,
}

/// Download the detail rows of one leg.
///
/// Waits a random jitter delay first so the pool does not hit the service in
/// lockstep. A failure is reported as [`Event::TaskFailed`] and returned; the
/// pool turns it into an empty contribution.
pub(super) async fn download_leg(params: LegDownload) -> Result<Vec<Record>> {
    let LegDownload {
        service,
        task,
        jitter_min,
        jitter_max,
        event_tx,
    } = params;

    jitter_delay(jitter_min, jitter_max).await;

    match service.fetch_leg_detail(&task).await {
        Ok(rows) => {
            tracing::debug!(
                flight = %task.flight,
                date = %task.date,
                leg = %task.leg,
                rows = rows.len(),
                "leg downloaded"
            );
            Ok(rows)
        }
        Err(e) => {
            tracing::warn!(
                flight = %task.flight,
                date = %task.date,
                leg = %task.leg,
                error = %e,
                "download failed for leg"
            );
            event_tx
                .send(Event::TaskFailed {
                    task,
                    error: e.to_string(),
                })
                .ok();
            Err(e)
        }
    }
}
