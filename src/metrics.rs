//! Metrics for the CT log store
//!
//! [`MetricsSink`] is notified on every log store state transition.
//! [`PrometheusMetrics`] records those transitions in a process-wide
//! Prometheus registry.

use std::sync::Arc;

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};
use tracing::warn;

use crate::ct_log::{LogStoreSnapshot, LogStoreState};

/// Receiver of log store state transitions.
///
/// Called after the store lock is released, with the snapshot taken at the
/// moment of the transition. Transitions arrive one at a time in the order
/// they happened, possibly on another caller's thread. Every reload counts
/// as a transition out of UNINITIALIZED. Implementations must not block.
pub trait MetricsSink: Send + Sync {
    fn log_list_status_changed(&self, previous: LogStoreState, snapshot: &LogStoreSnapshot);
}

impl<T: MetricsSink + ?Sized> MetricsSink for Arc<T> {
    fn log_list_status_changed(&self, previous: LogStoreState, snapshot: &LogStoreSnapshot) {
        (**self).log_list_status_changed(previous, snapshot)
    }
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn log_list_status_changed(&self, _previous: LogStoreState, _snapshot: &LogStoreSnapshot) {}
}

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Log list status changes
    /// Labels: state="uninitialized|not_found|malformed|loaded|compliant|non_compliant"
    pub static ref LOG_LIST_STATUS_CHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "ctlogstore_log_list_status_changes_total",
            "Total number of log store state transitions, by new state"
        ),
        &["state"]
    ).expect("metric cannot be created");

    /// Current state as a numeric code (see LogStoreState::code)
    pub static ref LOG_LIST_STATE: IntGauge = IntGauge::new(
        "ctlogstore_log_list_state",
        "Current log store state (0=uninitialized, 1=not_found, 2=malformed, 3=loaded, 4=compliant, 5=non_compliant)"
    ).expect("metric cannot be created");

    /// Compatibility version of the loaded list (0 when none is loaded)
    pub static ref LOG_LIST_COMPAT_VERSION: IntGauge = IntGauge::new(
        "ctlogstore_log_list_compat_version",
        "Compatibility version of the loaded log list"
    ).expect("metric cannot be created");

    pub static ref LOG_LIST_MAJOR_VERSION: IntGauge = IntGauge::new(
        "ctlogstore_log_list_major_version",
        "Major version of the loaded log list"
    ).expect("metric cannot be created");

    pub static ref LOG_LIST_MINOR_VERSION: IntGauge = IntGauge::new(
        "ctlogstore_log_list_minor_version",
        "Minor version of the loaded log list"
    ).expect("metric cannot be created");

    /// Number of logs in the loaded list
    pub static ref KNOWN_LOGS: IntGauge = IntGauge::new(
        "ctlogstore_known_logs",
        "Number of CT logs in the loaded log list"
    ).expect("metric cannot be created");
}

/// Initialize metrics registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(LOG_LIST_STATUS_CHANGES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LOG_LIST_STATE.clone()))?;
    REGISTRY.register(Box::new(LOG_LIST_COMPAT_VERSION.clone()))?;
    REGISTRY.register(Box::new(LOG_LIST_MAJOR_VERSION.clone()))?;
    REGISTRY.register(Box::new(LOG_LIST_MINOR_VERSION.clone()))?;
    REGISTRY.register(Box::new(KNOWN_LOGS.clone()))?;

    Ok(())
}

/// Export metrics in Prometheus text format
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

/// Records transitions in the global Prometheus registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn log_list_status_changed(&self, _previous: LogStoreState, snapshot: &LogStoreSnapshot) {
        LOG_LIST_STATUS_CHANGES_TOTAL
            .with_label_values(&[snapshot.state.as_str()])
            .inc();
        LOG_LIST_STATE.set(snapshot.state.code());
        LOG_LIST_COMPAT_VERSION.set(i64::from(snapshot.compat_version));
        LOG_LIST_MAJOR_VERSION.set(i64::from(snapshot.major_version));
        LOG_LIST_MINOR_VERSION.set(i64::from(snapshot.minor_version));
        KNOWN_LOGS.set(snapshot.log_count() as i64);
    }
}
