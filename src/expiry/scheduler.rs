//! Scheduled expiry sweep - background task that applies the retention window.
//!
//! Capacity bounds keep the store from growing, but a quiet sensor fleet can
//! leave stale readings resident indefinitely. The scheduler runs an
//! [`ExpiryService`] sweep on a fixed interval so records older than the
//! configured retention are evicted (and their alerts invalidated) even when
//! no new records arrive.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::time::interval;

use crate::config::ExpiryConfig;
use crate::expiry::{ExpiryService, ExpiryStats};
use crate::store::EventStore;
use crate::types::now_ms;
use log::info;

/// Scheduler for periodic expiry sweeps.
///
/// Spawned as a tokio task next to the ingest loop. Every sweep goes through
/// the store's write lock, so it serializes with ingestion.
pub struct ExpiryScheduler {
    service: ExpiryService,
    config: ExpiryConfig,
    /// Timestamp of the last completed sweep
    last_sweep_at: Arc<RwLock<u64>>,
}

impl ExpiryScheduler {
    pub fn new(store: EventStore, config: ExpiryConfig) -> Self {
        Self {
            service: ExpiryService::new(store, &config),
            config,
            last_sweep_at: Arc::new(RwLock::new(now_ms())),
        }
    }

    /// Milliseconds since UNIX epoch of the last sweep, or creation time if
    /// none has run yet.
    pub fn last_sweep(&self) -> u64 {
        *self.last_sweep_at.read()
    }

    /// Runs the sweep loop until the task is dropped.
    ///
    /// Returns immediately when expiry is disabled. The first tick fires
    /// right away, so a freshly started store sweeps once on startup.
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use sensor_store::{Capacity, EventStore, ExpiryConfig, ExpiryScheduler};
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = EventStore::new(Capacity::Records(1024))?;
    /// let scheduler = Arc::new(ExpiryScheduler::new(store, ExpiryConfig::default()));
    /// tokio::spawn(scheduler.clone().start());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(self: Arc<Self>) {
        if !self.config.enabled {
            info!("Scheduled expiry is disabled, skipping");
            return;
        }

        info!(
            "Starting scheduled expiry with {}-second interval, retention {}ms",
            self.config.sweep_interval_secs,
            self.service.retention_ms()
        );

        let mut ticker = interval(self.config.sweep_interval());
        loop {
            ticker.tick().await;
            self.do_sweep();
        }
    }

    /// Executes one sweep cycle and records its completion time.
    pub fn do_sweep(&self) -> ExpiryStats {
        let stats = self.service.sweep_now();
        info!(
            "Scheduled expiry completed: {} records expired in {}ms",
            stats.records_expired, stats.duration_ms
        );
        *self.last_sweep_at.write() = stats.timestamp;
        stats
    }
}
