// src/ct_log/store.rs
//! Cached, self-refreshing view of the trusted CT log list.
//!
//! [`LogStore`] owns the state machine that decides whether the on-disk log
//! list can be relied upon. Every failure degrades to a [`LogStoreState`];
//! nothing here returns an error or panics to the caller.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::log_list;
use super::policy::{CompliancePolicy, MinimumLogsPolicy};
use super::source::{FileLogListSource, LogListSource};
use super::types::{LogId, LogInfo, LogListDocument};
use crate::config::Config;
use crate::error::LoadError;
use crate::metrics::{MetricsSink, NoopMetrics, PrometheusMetrics};

/// Log list format generation understood by this store
pub const COMPAT_VERSION: u32 = 1;

/// Minimum time between two checks of the source's modification time
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Readiness of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStoreState {
    /// Nothing loaded yet, or the cache was just invalidated
    Uninitialized,
    /// The log list could not be read
    NotFound,
    /// The log list was read but rejected
    Malformed,
    /// Parsed, not (yet) evaluated by a policy
    Loaded,
    Compliant,
    NonCompliant,
}

impl LogStoreState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStoreState::Uninitialized => "uninitialized",
            LogStoreState::NotFound => "not_found",
            LogStoreState::Malformed => "malformed",
            LogStoreState::Loaded => "loaded",
            LogStoreState::Compliant => "compliant",
            LogStoreState::NonCompliant => "non_compliant",
        }
    }

    /// Numeric code reported through metrics gauges
    pub fn code(&self) -> i64 {
        match self {
            LogStoreState::Uninitialized => 0,
            LogStoreState::NotFound => 1,
            LogStoreState::Malformed => 2,
            LogStoreState::Loaded => 3,
            LogStoreState::Compliant => 4,
            LogStoreState::NonCompliant => 5,
        }
    }

    fn has_document(&self) -> bool {
        matches!(
            self,
            LogStoreState::Loaded | LogStoreState::Compliant | LogStoreState::NonCompliant
        )
    }
}

impl fmt::Display for LogStoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of the store at one point in time
#[derive(Debug, Clone)]
pub struct LogStoreSnapshot {
    pub state: LogStoreState,
    pub compat_version: u32,
    pub major_version: u32,
    pub minor_version: u32,
    /// Publication time of the list in epoch millis (0 when nothing is loaded)
    pub timestamp: i64,
    pub document: Option<Arc<LogListDocument>>,
}

impl LogStoreSnapshot {
    /// All known logs, in no particular order
    pub fn logs(&self) -> impl Iterator<Item = &LogInfo> {
        self.document
            .as_deref()
            .into_iter()
            .flat_map(|doc| doc.logs().values())
    }

    pub fn log_count(&self) -> usize {
        self.document.as_ref().map_or(0, |doc| doc.len())
    }
}

struct Cache {
    state: LogStoreState,
    document: Option<Arc<LogListDocument>>,
    /// Modification time observed at the last successful load
    source_last_modified: Option<SystemTime>,
    /// Clock reading at the last staleness check
    last_checked_at: Option<Duration>,
    /// Transitions not yet delivered to the metrics sink, oldest first
    pending: VecDeque<Transition>,
}

impl Cache {
    fn new() -> Self {
        Self {
            state: LogStoreState::Uninitialized,
            document: None,
            source_last_modified: None,
            last_checked_at: None,
            pending: VecDeque::new(),
        }
    }

    fn reset(&mut self) {
        self.state = LogStoreState::Uninitialized;
        self.document = None;
    }

    fn snapshot(&self) -> LogStoreSnapshot {
        let compat_version = if self.state.has_document() {
            COMPAT_VERSION
        } else {
            0
        };

        LogStoreSnapshot {
            state: self.state,
            compat_version,
            major_version: self.document.as_ref().map_or(0, |doc| doc.major_version()),
            minor_version: self.document.as_ref().map_or(0, |doc| doc.minor_version()),
            timestamp: self.document.as_ref().map_or(0, |doc| doc.timestamp()),
            document: self.document.clone(),
        }
    }
}

type Transition = (LogStoreState, LogStoreSnapshot);

/// Thread-safe store of known CT logs.
///
/// Cloning yields another handle to the same cache.
pub struct LogStore {
    source: Arc<dyn LogListSource>,
    policy: Option<Arc<dyn CompliancePolicy>>,
    metrics: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
    trust_loaded_without_policy: bool,
    cache: Arc<Mutex<Cache>>,
    /// Held by the one thread currently draining `Cache::pending`
    dispatch: Arc<Mutex<()>>,
}

impl LogStore {
    pub fn builder(source: impl LogListSource + 'static) -> LogStoreBuilder {
        LogStoreBuilder::new(Arc::new(source))
    }

    /// Store over a log list file, with the policy and metrics sink
    /// selected by `config`
    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::builder(FileLogListSource::new(
            config.log_store.log_list_path.clone(),
        ))
        .check_interval(Duration::from_secs(config.log_store.check_interval_secs))
        .trust_loaded_without_policy(config.log_store.trust_loaded_without_policy);

        if config.policy.enabled {
            builder = builder.policy(MinimumLogsPolicy::from(&config.policy));
        }

        if config.metrics.enabled {
            builder = builder.metrics(PrometheusMetrics);
        }

        builder.build()
    }

    /// Make sure the cached log list is current and classified.
    ///
    /// Returns true when the store can be used for SCT-based trust: the
    /// state is COMPLIANT, or LOADED with no policy configured and
    /// `trust_loaded_without_policy` set.
    pub fn ensure_loaded(&self) -> bool {
        let usable = {
            let mut cache = self.cache.lock();
            self.refresh(&mut cache);
            self.is_usable(cache.state)
        };

        self.dispatch_pending();
        usable
    }

    /// Look up a log by its raw id bytes.
    ///
    /// Empty or wrongly sized ids yield `None` without touching the source.
    pub fn get_known_log(&self, log_id: &[u8]) -> Option<LogInfo> {
        let id = LogId::from_slice(log_id)?;
        self.known_log(&id)
    }

    /// Look up a log by id, refreshing the cache first
    pub fn known_log(&self, log_id: &LogId) -> Option<LogInfo> {
        let found = {
            let mut cache = self.cache.lock();
            self.refresh(&mut cache);
            if self.is_usable(cache.state) {
                cache
                    .document
                    .as_ref()
                    .and_then(|doc| doc.get(log_id).cloned())
            } else {
                None
            }
        };

        self.dispatch_pending();
        found
    }

    pub fn state(&self) -> LogStoreState {
        self.cache.lock().state
    }

    /// Publication time of the cached list in epoch millis
    pub fn timestamp(&self) -> i64 {
        self.snapshot().timestamp
    }

    pub fn major_version(&self) -> u32 {
        self.snapshot().major_version
    }

    pub fn minor_version(&self) -> u32 {
        self.snapshot().minor_version
    }

    /// [`COMPAT_VERSION`] while a list is loaded, otherwise 0
    pub fn compat_version(&self) -> u32 {
        self.snapshot().compat_version
    }

    /// Only one compatibility version is supported, so this equals
    /// [`LogStore::compat_version`]
    pub fn min_compat_version_available(&self) -> u32 {
        self.compat_version()
    }

    pub fn snapshot(&self) -> LogStoreSnapshot {
        self.cache.lock().snapshot()
    }

    /// Re-open the staleness gate so the next call re-checks the source
    pub fn expire_check(&self) {
        self.cache.lock().last_checked_at = None;
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn has_policy(&self) -> bool {
        self.policy.is_some()
    }

    fn is_usable(&self, state: LogStoreState) -> bool {
        match state {
            LogStoreState::Compliant => true,
            LogStoreState::Loaded => self.policy.is_none() && self.trust_loaded_without_policy,
            _ => false,
        }
    }

    /// One full check-reload-classify cycle. Must run under the lock.
    ///
    /// A reload always starts from UNINITIALIZED, so it is queued as a
    /// transition even when it ends in the state the store was in before.
    fn refresh(&self, cache: &mut Cache) {
        self.reset_if_required(cache);

        let previous = cache.state;

        if cache.state == LogStoreState::Uninitialized {
            cache.state = self.load(cache);
        }

        if cache.state == LogStoreState::Loaded {
            if let Some(policy) = &self.policy {
                cache.state = Self::evaluate(policy.as_ref(), cache);
            }
        }

        if cache.state != previous {
            let snapshot = cache.snapshot();
            cache.pending.push_back((previous, snapshot));
        }
    }

    fn reset_if_required(&self, cache: &mut Cache) {
        let now = self.clock.now();
        if let Some(last_checked) = cache.last_checked_at {
            if now.saturating_sub(last_checked) < self.check_interval {
                return;
            }
        }
        cache.last_checked_at = Some(now);

        match self.source.last_modified() {
            Ok(modified) if cache.source_last_modified == Some(modified) => {
                // Same content as the cached copy
                return;
            }
            Ok(_) => {}
            Err(e) => {
                if cache.source_last_modified.is_none() {
                    debug!("Log list not accessible and never loaded: {}", e);
                } else {
                    warn!("Log list not accessible, keeping cached copy: {}", e);
                }
                return;
            }
        }

        if cache.state != LogStoreState::Uninitialized {
            info!("Log list changed on disk, reloading (was {})", cache.state);
        }
        cache.reset();
    }

    fn load(&self, cache: &mut Cache) -> LogStoreState {
        match self.read_document() {
            Ok((document, modified)) => {
                info!(
                    "Loaded log list v{}.{} with {} logs",
                    document.major_version(),
                    document.minor_version(),
                    document.len()
                );
                cache.document = Some(Arc::new(document));
                cache.source_last_modified = Some(modified);
                LogStoreState::Loaded
            }
            Err(LoadError::SourceUnavailable(e)) => {
                warn!("Unable to read log list: {}", e);
                LogStoreState::NotFound
            }
            Err(LoadError::Malformed(e)) => {
                warn!("Unable to parse log list: {}", e);
                LogStoreState::Malformed
            }
        }
    }

    fn read_document(&self) -> Result<(LogListDocument, SystemTime), LoadError> {
        let content = self.source.read()?;
        let modified = self.source.last_modified()?;
        let document = log_list::parse(&content)?;
        Ok((document, modified))
    }

    /// Policies are total; a panicking policy counts as non-compliant
    fn evaluate(policy: &dyn CompliancePolicy, cache: &Cache) -> LogStoreState {
        let snapshot = cache.snapshot();
        match panic::catch_unwind(AssertUnwindSafe(|| policy.is_compliant(&snapshot))) {
            Ok(true) => LogStoreState::Compliant,
            Ok(false) => LogStoreState::NonCompliant,
            Err(_) => {
                warn!("Compliance policy panicked, treating log list as non-compliant");
                LogStoreState::NonCompliant
            }
        }
    }

    /// Deliver queued transitions in the order they happened.
    ///
    /// Runs without the cache lock held. Only one thread drains at a time; a
    /// caller that finds the drain busy leaves its transitions to that
    /// thread. The re-check after releasing `dispatch` picks up anything
    /// queued while the drainer was finishing.
    fn dispatch_pending(&self) {
        loop {
            let Some(guard) = self.dispatch.try_lock() else {
                return;
            };

            loop {
                let next = self.cache.lock().pending.pop_front();
                let Some((previous, snapshot)) = next else {
                    break;
                };
                self.report(previous, &snapshot);
            }

            drop(guard);
            if self.cache.lock().pending.is_empty() {
                return;
            }
        }
    }

    fn report(&self, previous: LogStoreState, snapshot: &LogStoreSnapshot) {
        info!("Log store state changed: {} -> {}", previous, snapshot.state);

        let metrics = &self.metrics;
        if panic::catch_unwind(AssertUnwindSafe(|| {
            metrics.log_list_status_changed(previous, snapshot)
        }))
        .is_err()
        {
            warn!("Metrics sink panicked while reporting log store state");
        }
    }
}

impl Clone for LogStore {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            policy: self.policy.clone(),
            metrics: Arc::clone(&self.metrics),
            clock: Arc::clone(&self.clock),
            check_interval: self.check_interval,
            trust_loaded_without_policy: self.trust_loaded_without_policy,
            cache: Arc::clone(&self.cache),
            dispatch: Arc::clone(&self.dispatch),
        }
    }
}

impl fmt::Debug for LogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStore")
            .field("state", &self.state())
            .field("check_interval", &self.check_interval)
            .field("has_policy", &self.has_policy())
            .finish()
    }
}

/// Builder for [`LogStore`]
pub struct LogStoreBuilder {
    source: Arc<dyn LogListSource>,
    policy: Option<Arc<dyn CompliancePolicy>>,
    metrics: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
    trust_loaded_without_policy: bool,
}

impl LogStoreBuilder {
    fn new(source: Arc<dyn LogListSource>) -> Self {
        Self {
            source,
            policy: None,
            metrics: Arc::new(NoopMetrics),
            clock: Arc::new(SystemClock::new()),
            check_interval: DEFAULT_CHECK_INTERVAL,
            trust_loaded_without_policy: false,
        }
    }

    pub fn policy(mut self, policy: impl CompliancePolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn shared_policy(mut self, policy: Arc<dyn CompliancePolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn metrics(mut self, metrics: impl MetricsSink + 'static) -> Self {
        self.metrics = Arc::new(metrics);
        self
    }

    pub fn shared_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Treat LOADED as usable when no policy is configured
    pub fn trust_loaded_without_policy(mut self, trust: bool) -> Self {
        self.trust_loaded_without_policy = trust;
        self
    }

    pub fn build(self) -> LogStore {
        LogStore {
            source: self.source,
            policy: self.policy,
            metrics: self.metrics,
            clock: self.clock,
            check_interval: self.check_interval,
            trust_loaded_without_policy: self.trust_loaded_without_policy,
            cache: Arc::new(Mutex::new(Cache::new())),
            dispatch: Arc::new(Mutex::new(())),
        }
    }
}
