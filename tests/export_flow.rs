//! End-to-end export against a mock optimizer service
//!
//! These tests drive `LegMapExporter` over real HTTP and verify:
//! - Schedule filtering and one leg-structure lookup per flight
//! - Per-flight and per-leg failure isolation
//! - CSV contents and the saved artifact

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use common::{drain_events, mount_leg_detail, mount_leg_structure, mount_schedule, test_config};
use legmap_dl::{DateRange, Event, ExportOutcome, ExportRequest, LegMapExporter, NoopSubscriber};
use serde_json::json;
use wiremock::MockServer;

#[tokio::test]
async fn exports_reachable_legs_and_skips_broken_flights() {
    let server = MockServer::start().await;
    mount_schedule(
        &server,
        json!({
            "00001": [20241231, 20250101, 20250102],
            "00005": [20250103]
        }),
        2,
    )
    .await;
    mount_leg_structure(
        &server,
        "00001",
        200,
        json!({"legMapping": {"LIS-OPO": {}, "OPO-FNC": {}}}),
        1,
    )
    .await;
    mount_leg_structure(&server, "00005", 503, json!({"error": "unavailable"}), 1).await;
    mount_leg_detail(&server, "LIS", 200, json!([{"CABIN": "Y", "SEATS": 12}])).await;
    mount_leg_detail(&server, "OPO", 500, json!({"error": "boom"})).await;

    let exporter = LegMapExporter::new(test_config(&server)).unwrap();
    let mut events = exporter.subscribe();
    let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
    let request = ExportRequest::from_input("00001, 00005", Some(range)).unwrap();

    let outcome = exporter
        .export(&request, Arc::new(NoopSubscriber))
        .await
        .unwrap();

    let artifact = match outcome {
        ExportOutcome::Completed(artifact) => artifact,
        other => panic!("expected an artifact, got {other:?}"),
    };
    assert_eq!(
        artifact.csv,
        "CABIN,SEATS,FLIGHT_NUMBER,FLIGHT_DATE\r\n\
         Y,12,00001,20250101\r\n\
         Y,12,00001,20250102\r\n"
    );

    let events = drain_events(&mut events);
    let skipped: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::FlightSkipped { flight, .. } => Some(flight.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["00005"]);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, Event::TasksResolved { total: 4 }))
    );
    let failed = events
        .iter()
        .filter(|e| matches!(e, Event::TaskFailed { .. }))
        .count();
    assert_eq!(failed, 2);
}

#[tokio::test]
async fn nothing_in_range_reports_no_tasks() {
    let server = MockServer::start().await;
    mount_schedule(&server, json!({"00001": [20250301]}), 1).await;

    let exporter = LegMapExporter::new(test_config(&server)).unwrap();
    let range = DateRange::parse("20250101", "20250131").unwrap();
    let request = ExportRequest::from_input("00001", Some(range)).unwrap();

    let outcome = exporter
        .export(&request, Arc::new(NoopSubscriber))
        .await
        .unwrap();

    assert_eq!(outcome, ExportOutcome::NoTasks);
}

#[tokio::test]
async fn completed_artifact_is_saved() {
    let server = MockServer::start().await;
    mount_schedule(&server, json!({"00001": ["20250110"]}), 1).await;
    mount_leg_structure(&server, "00001", 200, json!({"legMapping": {"LIS-FNC": {}}}), 1).await;
    mount_leg_detail(&server, "LIS", 200, json!({"NOTE": "aisle, window"})).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&server);
    config.export.output_dir = dir.path().to_path_buf();
    let exporter = LegMapExporter::new(config).unwrap();
    let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
    let request = ExportRequest::from_input("00001", Some(range)).unwrap();

    let artifact = match exporter
        .export(&request, Arc::new(NoopSubscriber))
        .await
        .unwrap()
    {
        ExportOutcome::Completed(artifact) => artifact,
        other => panic!("expected an artifact, got {other:?}"),
    };
    let path = exporter.save(&artifact).await.unwrap();

    let written = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        written,
        "NOTE,FLIGHT_NUMBER,FLIGHT_DATE\r\n\"aisle, window\",00001,20250110\r\n"
    );
}
