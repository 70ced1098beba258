//! OTel counters for the synchronization job.

use std::sync::LazyLock;

use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::{global, KeyValue};

use super::MetricsPusher;
use crate::resync::ResyncError;

static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("tenant_fetcher"));

/// Total events API requests.
pub static EVENTING_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("tenant_fetcher.eventing.requests.total")
        .with_description("Total tenant events API requests")
        .build()
});

/// Total failed synchronization cycles.
pub static SYNC_FAILURES_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("tenant_fetcher.sync.failures.total")
        .with_description("Total failed tenant synchronization cycles")
        .build()
});

/// Pusher backed by the global OTel meter provider.
#[derive(Debug, Clone)]
pub struct OtelMetricsPusher {
    job_name: String,
}

impl OtelMetricsPusher {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
        }
    }
}

impl MetricsPusher for OtelMetricsPusher {
    fn record_eventing_request(&self, method: &str, status_code: u16, desc: &str) {
        EVENTING_REQUESTS_TOTAL.add(
            1,
            &[
                KeyValue::new("job", self.job_name.clone()),
                KeyValue::new("method", method.to_string()),
                KeyValue::new("code", i64::from(status_code)),
                KeyValue::new("desc", desc.to_string()),
            ],
        );
    }

    fn report_failed_sync(&self, err: &ResyncError) {
        tracing::error!(job = %self.job_name, error = %err, "Tenant synchronization failed");
        SYNC_FAILURES_TOTAL.add(1, &[KeyValue::new("job", self.job_name.clone())]);
    }
}
