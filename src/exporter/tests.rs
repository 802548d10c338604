//! Tests for the export orchestration.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::client::{FLIGHT_DATE_FIELD, FLIGHT_NUMBER_FIELD, tag_records};
use crate::config::DownloadConfig;
use crate::progress::NoopSubscriber;
use crate::types::{DownloadTask, FlightDate, LegId, LegMap, Record};

/// In-memory service: one schedule and leg list per flight, scripted leg rows
#[derive(Default)]
struct ScriptedService {
    schedules: HashMap<String, Vec<u32>>,
    legs: HashMap<String, Vec<LegId>>,
    /// Rows per "ORIGIN-DEST"; a missing entry makes the leg download fail
    rows: HashMap<String, serde_json::Value>,
    detail_calls: AtomicUsize,
}

impl ScriptedService {
    fn flight(mut self, flight: &str, dates: &[u32], legs: &[&str]) -> Self {
        self.schedules.insert(flight.into(), dates.to_vec());
        self.legs
            .insert(flight.into(), legs.iter().map(|k| LegId::from_key(k)).collect());
        self
    }

    fn rows(mut self, leg: &str, body: serde_json::Value) -> Self {
        self.rows.insert(leg.into(), body);
        self
    }
}

#[async_trait::async_trait]
impl RemoteService for ScriptedService {
    async fn fetch_schedule(&self, flight: &FlightId) -> Result<Vec<FlightDate>> {
        self.schedules
            .get(flight.as_str())
            .map(|d| d.iter().copied().map(FlightDate).collect())
            .ok_or_else(|| Error::MissingData(format!("no schedule entries for flight {flight}")))
    }

    async fn fetch_leg_map(&self, flight: &FlightId, _date: FlightDate) -> Result<LegMap> {
        self.legs
            .get(flight.as_str())
            .map(|legs| LegMap::from_legs(legs.iter().cloned()))
            .ok_or_else(|| Error::MissingData("no leg mapping".into()))
    }

    async fn fetch_leg_detail(&self, task: &DownloadTask) -> Result<Vec<Record>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        match self.rows.get(&task.leg.to_string()) {
            Some(body) => Ok(tag_records(body.clone(), &task.flight, task.date)),
            None => Err(Error::Network {
                status: 500,
                body: format!("no detail for {}", task.leg),
            }),
        }
    }
}

/// Records every subscriber call in order
#[derive(Default)]
struct RecordingSubscriber {
    calls: Mutex<Vec<String>>,
}

impl RecordingSubscriber {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProgressSubscriber for RecordingSubscriber {
    fn show(&self) {
        self.calls.lock().unwrap().push("show".into());
    }

    fn hide(&self) {
        self.calls.lock().unwrap().push("hide".into());
    }

    fn update(&self, completed: u64, total: u64) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{completed}/{total}"));
    }
}

fn fast_config() -> Config {
    Config {
        download: DownloadConfig {
            concurrency: 2,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        },
        ..Config::default()
    }
}

fn exporter(service: ScriptedService) -> (LegMapExporter, Arc<ScriptedService>) {
    let service = Arc::new(service);
    let exporter = LegMapExporter::with_service(fast_config(), service.clone());
    (exporter, service)
}

fn request(flights: &str) -> ExportRequest {
    let range = DateRange::parse("2025-01-01", "2025-01-05").unwrap();
    ExportRequest::from_input(flights, Some(range)).unwrap()
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// -----------------------------------------------------------------------
// Input handling
// -----------------------------------------------------------------------

#[test]
fn flight_list_is_trimmed_and_empty_entries_dropped() {
    assert_eq!(
        parse_flight_list(" 00001, ,00005 ,,"),
        vec![FlightId::from("00001"), FlightId::from("00005")]
    );
}

#[test]
fn missing_range_or_empty_text_is_a_cancellation() {
    let range = DateRange::parse("20250101", "20250105").unwrap();

    assert!(matches!(
        ExportRequest::from_input("00001", None),
        Err(Error::Cancelled)
    ));
    assert!(matches!(
        ExportRequest::from_input("", Some(range)),
        Err(Error::Cancelled)
    ));
    assert!(matches!(
        ExportRequest::from_input(" , ", Some(range)),
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn export_rejects_requests_before_showing_progress() {
    let (exporter, _) = exporter(ScriptedService::default());
    let subscriber = Arc::new(RecordingSubscriber::default());

    let no_range = ExportRequest {
        flights: vec![FlightId::from("00001")],
        range: None,
    };
    let err = exporter.export(&no_range, subscriber.clone()).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let no_flights = ExportRequest {
        flights: vec![],
        range: Some(DateRange::parse("20250101", "20250105").unwrap()),
    };
    let err = exporter.export(&no_flights, subscriber.clone()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    assert!(subscriber.calls().is_empty());
}

// -----------------------------------------------------------------------
// Full runs
// -----------------------------------------------------------------------

#[tokio::test]
async fn export_produces_csv_with_unified_columns() {
    let service = ScriptedService::default()
        .flight("00001", &[20241231, 20250102, 20250110], &["LIS-OPO", "OPO-FNC"])
        .rows("LIS-OPO", json!({"A": 1, "B": 2}))
        .rows("OPO-FNC", json!([{"A": 3, "C": 4}]));
    let (exporter, service) = exporter(service);

    let outcome = exporter
        .export(&request("00001"), Arc::new(NoopSubscriber))
        .await
        .unwrap();

    let artifact = match outcome {
        ExportOutcome::Completed(artifact) => artifact,
        other => panic!("expected an artifact, got {other:?}"),
    };
    assert_eq!(service.detail_calls.load(Ordering::SeqCst), 2);
    assert_eq!(artifact.rows, 2);
    assert_eq!(
        artifact.columns,
        vec!["A", "B", FLIGHT_NUMBER_FIELD, FLIGHT_DATE_FIELD, "C"]
    );
    assert_eq!(
        artifact.csv,
        "A,B,FLIGHT_NUMBER,FLIGHT_DATE,C\r\n\
         1,2,00001,20250102,\r\n\
         3,,00001,20250102,4\r\n"
    );
    assert!(artifact.filename.starts_with("odiflegmap-"));
    assert!(artifact.filename.ends_with(".csv"));
}

#[tokio::test]
async fn failed_legs_reduce_output_without_failing_the_run() {
    let service = ScriptedService::default()
        .flight("00001", &[20250101, 20250102], &["LIS-OPO", "OPO-FNC"])
        .rows("OPO-FNC", json!({"SEATS": 180}));
    let (exporter, _) = exporter(service);
    let mut events = exporter.subscribe();

    let outcome = exporter
        .export(&request("00001"), Arc::new(NoopSubscriber))
        .await
        .unwrap();

    let artifact = match outcome {
        ExportOutcome::Completed(artifact) => artifact,
        other => panic!("expected an artifact, got {other:?}"),
    };
    assert_eq!(artifact.rows, 2, "one surviving leg on each of two dates");

    let events = drain(&mut events);
    let failed = events
        .iter()
        .filter(|e| matches!(e, Event::TaskFailed { .. }))
        .count();
    assert_eq!(failed, 2);
    assert!(matches!(events.last(), Some(Event::ExportComplete { rows: 2, .. })));
}

#[tokio::test]
async fn zero_tasks_and_zero_rows_are_distinct_outcomes() {
    // No schedule at all: nothing to download
    let (exporter_a, _) = exporter(ScriptedService::default());
    let outcome = exporter_a
        .export(&request("00001"), Arc::new(NoopSubscriber))
        .await
        .unwrap();
    assert_eq!(outcome, ExportOutcome::NoTasks);

    // Legs exist but every download fails
    let (exporter_b, service) =
        exporter(ScriptedService::default().flight("00001", &[20250101], &["LIS-OPO"]));
    let outcome = exporter_b
        .export(&request("00001"), Arc::new(NoopSubscriber))
        .await
        .unwrap();
    assert_eq!(outcome, ExportOutcome::NoData);
    assert_eq!(service.detail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn progress_is_shown_updated_and_hidden() {
    let service = ScriptedService::default()
        .flight("00001", &[20250101], &["LIS-OPO", "OPO-FNC", "FNC-LIS"])
        .rows("LIS-OPO", json!({"A": 1}))
        .rows("FNC-LIS", json!({"A": 2}));
    let (exporter, _) = exporter(service);
    let subscriber = Arc::new(RecordingSubscriber::default());

    exporter
        .export(&request("00001"), subscriber.clone())
        .await
        .unwrap();

    assert_eq!(
        subscriber.calls(),
        vec!["show", "0/3", "1/3", "2/3", "3/3", "hide"]
    );
}

#[tokio::test]
async fn progress_is_hidden_when_nothing_is_found() {
    let (exporter, _) = exporter(ScriptedService::default());
    let subscriber = Arc::new(RecordingSubscriber::default());

    exporter
        .export(&request("00001"), subscriber.clone())
        .await
        .unwrap();

    assert_eq!(subscriber.calls(), vec!["show", "hide"]);
}

#[tokio::test]
async fn events_describe_the_run() {
    let service = ScriptedService::default()
        .flight("00001", &[20250102], &["LIS-OPO"])
        .rows("LIS-OPO", json!({"A": 1}));
    let (exporter, _) = exporter(service);
    let mut events = exporter.subscribe();

    exporter
        .export(&request("00001,00002"), Arc::new(NoopSubscriber))
        .await
        .unwrap();

    let kinds: Vec<String> = drain(&mut events)
        .into_iter()
        .map(|e| serde_json::to_value(e).unwrap()["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "export_started",
            "flight_skipped",
            "tasks_resolved",
            "task_completed",
            "export_complete"
        ]
    );
}

#[tokio::test]
async fn artifact_is_saved_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScriptedService::default()
        .flight("00001", &[20250102], &["LIS-OPO"])
        .rows("LIS-OPO", json!({"A": 1}));
    let mut config = fast_config();
    config.export.output_dir = dir.path().join("exports");
    let exporter = LegMapExporter::with_service(config, Arc::new(service));

    let ExportOutcome::Completed(artifact) = exporter
        .export(&request("00001"), Arc::new(NoopSubscriber))
        .await
        .unwrap()
    else {
        panic!("expected an artifact");
    };
    let path = exporter.save(&artifact).await.unwrap();

    assert_eq!(path, dir.path().join("exports").join(&artifact.filename));
    let written = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(written, artifact.csv);
}
