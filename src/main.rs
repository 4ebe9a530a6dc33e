//! # Sensor Store Entry Point
//!
//! Reads newline-delimited JSON from stdin, ingests sensor records, queues
//! alerts, then drains the alert queue in priority order.
//!
//! Each input line is either a record
//! `{"id":101,"location":"Building_A","sensor_type":"temperature","value":72.5}`
//! or a standalone alert
//! `{"priority":9,"kind":"CRITICAL","message":"Critical system failure"}`.
//!
//! `--demo` runs a built-in sample instead of reading stdin. Configuration is
//! read from the JSON file named by `SENSOR_STORE_CONFIG`, if set.

use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use sensor_store::{
    AlertDraft, AlertKind, EventStore, ExpiryScheduler, Record, RecordId, StoreConfig, StoreResult,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum InputLine {
    Record(Record),
    Alert(AlertDraft),
}

fn load_config() -> StoreResult<StoreConfig> {
    match std::env::var("SENSOR_STORE_CONFIG") {
        Ok(path) => StoreConfig::from_path(path),
        Err(_) => Ok(StoreConfig::default()),
    }
}

fn apply(store: &EventStore, line: InputLine) {
    match line {
        InputLine::Record(record) => {
            let id = record.id;
            match store.ingest(record, Vec::new()) {
                Ok(outcome) if !outcome.evicted.is_empty() => println!(
                    "  + {} (evicted {} record(s), {} alert(s) invalidated)",
                    id,
                    outcome.evicted.len(),
                    outcome.invalidated
                ),
                Ok(_) => println!("  + {}", id),
                Err(e) => eprintln!("  ✗ {}: {}", id, e),
            }
        }
        InputLine::Alert(draft) => {
            if let Err(e) = store.raise_alert(draft) {
                eprintln!("  ✗ alert rejected: {}", e);
            }
        }
    }
}

/// Drains the alert queue in priority order, one line per alert.
///
/// Returns how many alerts were processed.
fn process_alerts<W: Write>(store: &EventStore, out: &mut W) -> std::io::Result<usize> {
    let mut processed = 0;
    while let Some(alert) = store.pop_next_valid() {
        writeln!(out, "Processing {}", alert)?;
        processed += 1;
    }
    if processed == 0 {
        writeln!(out, "No alerts to process - queue is empty")?;
    }
    Ok(processed)
}

fn demo_input() -> Vec<InputLine> {
    let records = [
        (101, "Building_A", "temperature", 72.5),
        (102, "Building_A", "humidity", 45.2),
        (201, "Building_B", "temperature", 68.1),
        (202, "Building_B", "humidity", 52.7),
        (301, "Building_C", "temperature", 74.3),
    ];
    let alerts = [
        (3, AlertKind::Warning, "Temperature threshold exceeded"),
        (9, AlertKind::Critical, "Critical system failure"),
        (1, AlertKind::Info, "Low battery detected"),
        (7, AlertKind::Error, "Network connectivity issue"),
    ];

    records
        .into_iter()
        .map(|(id, location, sensor_type, value)| {
            InputLine::Record(Record::now(id, location, sensor_type, value))
        })
        .chain(
            alerts
                .into_iter()
                .map(|(p, kind, msg)| InputLine::Alert(AlertDraft::new(p, kind, msg))),
        )
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=================================================");
    println!("  Sensor Store - Ingest & Alert Processing       ");
    println!("=================================================");
    println!();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let store = EventStore::from_config(&config)?;
    println!("✓ Store initialized");
    println!("  - Capacity: {}", store.capacity());
    println!("  - Alert rules: {}", config.rules.len());
    println!(
        "  - Expiry: {}",
        if config.expiry.enabled {
            format!(
                "every {}s, retention {}ms",
                config.expiry.sweep_interval_secs, config.expiry.retention_ms
            )
        } else {
            "disabled".to_string()
        }
    );
    println!();

    let scheduler = Arc::new(ExpiryScheduler::new(store.clone(), config.expiry.clone()));
    let sweeper = tokio::spawn(scheduler.clone().start());

    println!("Ingesting...");
    if std::env::args().any(|arg| arg == "--demo") {
        for line in demo_input() {
            apply(&store, line);
        }
        if let Some(record) = store.get(RecordId(102)) {
            println!("✓ Found sensor {} in {}", record.id, record.group);
        }
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(raw) = lines.next_line().await? {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match serde_json::from_str::<InputLine>(raw) {
                Ok(line) => apply(&store, line),
                Err(e) => eprintln!("  ✗ skipping malformed line: {}", e),
            }
        }
    }
    println!();

    println!("Groups:");
    for group in store.group_keys() {
        println!(
            "  - {:<15} {} record(s)",
            group,
            store.group_len(&group)
        );
    }
    println!();

    println!("Processing alerts...");
    process_alerts(&store, &mut std::io::stdout().lock())?;
    println!();

    sweeper.abort();

    let stats = store.stats();
    println!("Store Statistics:");
    println!("  - Resident records: {}", stats.resident);
    println!("  - Groups: {}", stats.groups);
    println!("  - Total ingested: {}", stats.total_ingested);
    println!("  - Total evicted: {}", stats.total_evicted);
    println!("  - Total expired: {}", stats.total_expired);
    println!("  - Duplicates rejected: {}", stats.rejected_duplicates);
    println!("  - Alerts processed: {}", stats.alerts.popped);
    println!("  - Stale alerts discarded: {}", stats.alerts.discarded);
    println!();

    println!("=================================================");
    println!("  Sensor Store Shut Down");
    println!("=================================================");

    Ok(())
}
