//! Leg-map export example
//!
//! This example demonstrates the core functionality of legmap-dl:
//! - Loading configuration (optionally from a JSON file)
//! - Subscribing to events
//! - Rendering progress through a subscriber
//! - Saving the finished CSV
//!
//! Usage: `cargo run --example export -- "00001, 00005" 2025-01-01 2025-01-31 [config.json]`

use std::sync::Arc;

use legmap_dl::{
    Config, DateRange, Event, ExportOutcome, ExportRequest, LegMapExporter, ProgressState,
    ProgressSubscriber,
};

/// Prints progress lines to stdout
struct ConsoleProgress;

impl ProgressSubscriber for ConsoleProgress {
    fn show(&self) {
        println!("Fetching ODIF leg map data...");
    }

    fn hide(&self) {
        println!("Done.");
    }

    fn update(&self, completed: u64, total: u64) {
        let state = ProgressState { completed, total };
        if let Some(message) = state.message() {
            println!("[{:>3}%] {message}", state.percent());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let flights = args.first().map(String::as_str).unwrap_or_default();
    let range = match (args.get(1), args.get(2)) {
        (Some(start), Some(end)) => Some(DateRange::parse(start, end)?),
        _ => None,
    };
    let config = match args.get(3) {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    let request = match ExportRequest::from_input(flights, range) {
        Ok(request) => request,
        Err(legmap_dl::Error::Cancelled) => {
            println!("Export cancelled: flights and a date range are required");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let exporter = LegMapExporter::new(config)?;

    // Subscribe to events
    let mut events = exporter.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::FlightSkipped { flight, reason } => {
                    println!("Skipping flight {flight}: {reason}");
                }
                Event::TaskFailed { task, error } => {
                    println!("Leg {task} failed: {error}");
                }
                _ => {}
            }
        }
    });

    match exporter.export(&request, Arc::new(ConsoleProgress)).await? {
        ExportOutcome::Completed(artifact) => {
            let path = exporter.save(&artifact).await?;
            println!(
                "Wrote {} rows x {} columns to {}",
                artifact.rows,
                artifact.columns.len(),
                path.display()
            );
        }
        ExportOutcome::NoTasks => println!("No legs/tasks found to download."),
        ExportOutcome::NoData => println!("No data was downloaded."),
    }

    Ok(())
}
