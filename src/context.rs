// src/context.rs
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::ct_log::LogStore;
use crate::{logging, metrics};
use crate::watcher::LogListWatcher;

/// Application-owned log store plus the pieces that keep it fresh.
///
/// Hand out `store.clone()` to consumers; dropping the context stops the
/// file watcher.
pub struct LogStoreContext {
    pub store: LogStore,
    watcher: Option<LogListWatcher>,
}

impl LogStoreContext {
    /// Install logging and metrics, then build the store and its watcher.
    ///
    /// An already installed subscriber or registry is kept as is.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if let Err(e) = logging::init(&config.logging) {
            debug!("Keeping existing tracing subscriber: {}", e);
        }

        if config.metrics.enabled {
            if let Err(e) = metrics::init_metrics() {
                // Registration fails if another context already registered
                warn!("Metrics already registered: {}", e);
            }
        }

        let store = LogStore::from_config(config);

        let watcher = if config.log_store.watch {
            Some(LogListWatcher::spawn(
                store.clone(),
                config.log_store.log_list_path.clone(),
            )?)
        } else {
            None
        };

        info!(
            "Log store configured for {:?} (check interval {}s, policy {})",
            config.log_store.log_list_path,
            config.log_store.check_interval_secs,
            if config.policy.enabled { "enabled" } else { "disabled" }
        );

        Ok(Self { store, watcher })
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ct_log::LogStoreState;
    use tempfile::TempDir;

    #[test]
    fn test_context_without_watch() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.log_store.log_list_path = dir.path().join("log_list.json");

        let context = LogStoreContext::from_config(&config).unwrap();
        assert!(!context.is_watching());
        assert!(context.store.has_policy());

        assert!(!context.store.ensure_loaded());
        assert_eq!(context.store.state(), LogStoreState::NotFound);
    }

    #[test]
    fn test_context_with_watch() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.log_store.log_list_path = dir.path().join("log_list.json");
        config.log_store.watch = true;
        config.policy.enabled = false;

        let context = LogStoreContext::from_config(&config).unwrap();
        assert!(context.is_watching());
        assert!(!context.store.has_policy());
    }

    #[test]
    fn test_context_installs_logging() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.log_store.log_list_path = dir.path().join("log_list.json");

        // Building twice must not fail on the already installed subscriber
        LogStoreContext::from_config(&config).unwrap();
        LogStoreContext::from_config(&config).unwrap();
        assert!(logging::init(&config.logging).is_err());
    }

    #[test]
    fn test_context_watch_missing_directory_fails() {
        let mut config = Config::default();
        config.log_store.log_list_path = "/nonexistent/ct/v1/current/log_list.json".into();
        config.log_store.watch = true;

        assert!(LogStoreContext::from_config(&config).is_err());
    }
}
