//! Common test utilities for legmap-dl integration tests

use std::time::Duration;

use legmap_dl::{Config, DownloadConfig, Event, ServiceConfig};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration pointing at a mock server, with jitter disabled
pub fn test_config(server: &MockServer) -> Config {
    Config {
        service: ServiceConfig {
            base_url: format!("{}/optimizer", server.uri()),
            request_timeout: Duration::from_secs(5),
            ..ServiceConfig::default()
        },
        download: DownloadConfig {
            concurrency: 3,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        },
        ..Config::default()
    }
}

/// Schedule endpoint answering with the given `TP` flight table, expected `calls` times
pub async fn mount_schedule(server: &MockServer, flights: Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/optimizer/schedule"))
        .and(body_json(json!({"myMarkets": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "TP": flights })))
        .expect(calls)
        .mount(server)
        .await;
}

/// Leg structure endpoint for one flight, expected `calls` times
pub async fn mount_leg_structure(server: &MockServer, flight: &str, status: u16, body: Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/optimizer/dsc"))
        .and(body_partial_json(json!({"carrierCode": "TP", "flightNumber": flight})))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// Leg detail endpoint for one origin
pub async fn mount_leg_detail(server: &MockServer, origin: &str, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path("/optimizer/dsc/odiflegmap"))
        .and(query_param("origin", origin))
        .and(query_param("showFullList", "true"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Drain every event already buffered on a receiver
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
