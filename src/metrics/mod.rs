//! Fire-and-forget observability for the synchronization job.
//!
//! Pushers never influence control flow: every method is infallible.

#[cfg(feature = "otel")]
mod otel;

#[cfg(feature = "otel")]
pub use otel::OtelMetricsPusher;

use std::sync::Mutex;

use tracing::{debug, error};

use crate::resync::ResyncError;

/// Sink for job metrics.
pub trait MetricsPusher: Send + Sync {
    /// Record one completed events API request.
    fn record_eventing_request(&self, method: &str, status_code: u16, desc: &str);

    /// Report a failed synchronization cycle.
    fn report_failed_sync(&self, err: &ResyncError);
}

/// Pusher that only logs.
#[derive(Debug, Clone, Default)]
pub struct LoggingMetricsPusher {
    job_name: String,
}

impl LoggingMetricsPusher {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
        }
    }
}

impl MetricsPusher for LoggingMetricsPusher {
    fn record_eventing_request(&self, method: &str, status_code: u16, desc: &str) {
        debug!(job = %self.job_name, method, status_code, desc, "Eventing request");
    }

    fn report_failed_sync(&self, err: &ResyncError) {
        error!(job = %self.job_name, error = %err, "Tenant synchronization failed");
    }
}

/// One recorded eventing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub status_code: u16,
    pub desc: String,
}

/// In-memory pusher for tests.
#[derive(Debug, Default)]
pub struct RecordingMetricsPusher {
    requests: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingMetricsPusher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Display strings of reported sync failures.
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl MetricsPusher for RecordingMetricsPusher {
    fn record_eventing_request(&self, method: &str, status_code: u16, desc: &str) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method: method.to_string(),
                status_code,
                desc: desc.to_string(),
            });
        }
    }

    fn report_failed_sync(&self, err: &ResyncError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(err.to_string());
        }
    }
}
