//! Common test utilities for notify-queue integration tests
//!
//! This module provides:
//! - A recording log sink for asserting on queue events
//! - Scratch queues bound to a private key path and removed on drop

use chrono::{TimeZone, Utc};
use notify_queue::{
    BackendConfig, FixedClock, LogSink, QueueBackend, QueueDependencies, QueueEvent, QueueFactory,
    SysVQueueBackend, SysVQueueConfig, Timestamp,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Recording Log Sink
// ============================================================================

/// Log sink that keeps every event for inspection
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingSink {
    #[allow(dead_code)]
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn record(&self, event: &QueueEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// Scratch Queues
// ============================================================================

/// Fixed creation time used by the test clock
#[allow(dead_code)]
pub fn fixed_time() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
}

/// Configuration for a queue keyed on `dir`
pub fn scratch_config(dir: &Path) -> SysVQueueConfig {
    SysVQueueConfig::new("i")
        .with_name("integration")
        .with_key_path(dir)
        .with_permissions(0o600)
}

/// A native queue private to one test, removed when dropped
pub struct ScratchQueue {
    pub dir: TempDir,
    pub sink: Arc<RecordingSink>,
}

impl ScratchQueue {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    /// Backend instance recording events into the shared sink
    pub fn backend(&self) -> SysVQueueBackend {
        self.backend_with(QueueDependencies::new())
    }

    /// Backend instance with custom collaborators plus the shared sink
    pub fn backend_with(&self, deps: QueueDependencies) -> SysVQueueBackend {
        let deps = deps
            .with_clock(Arc::new(FixedClock::new(fixed_time())))
            .with_log_sink(self.sink.clone());
        SysVQueueBackend::new(scratch_config(self.dir.path()), deps).unwrap()
    }

    /// Backend built through the factory, as a trait object
    #[allow(dead_code)]
    pub fn boxed_backend(&self) -> Box<dyn QueueBackend> {
        let config = BackendConfig::SystemV(scratch_config(self.dir.path()));
        QueueFactory::create(config, QueueDependencies::new().with_log_sink(self.sink.clone()))
            .unwrap()
    }
}

impl Drop for ScratchQueue {
    fn drop(&mut self) {
        if let Ok(backend) = SysVQueueBackend::new(
            scratch_config(self.dir.path()),
            QueueDependencies::default(),
        ) {
            let _ = backend.remove();
        }
    }
}
