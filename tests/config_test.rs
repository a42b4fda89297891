// Test configuration loading
use ct_logstore::config::Config;
use ct_logstore::ct_log::{LogState, LogStore, LogStoreState};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[test]
fn test_load_test_config() {
    let config_path = Path::new("tests/test_config.toml");
    let config = Config::from_file(config_path).expect("Failed to load test config");

    assert_eq!(
        config.log_store.log_list_path,
        PathBuf::from("/var/lib/ct-logstore/ct/v1/current/log_list.json")
    );
    assert_eq!(config.log_store.check_interval_secs, 300);
    assert!(!config.log_store.trust_loaded_without_policy);
    assert!(!config.log_store.watch);

    assert!(config.policy.enabled);
    assert_eq!(config.policy.min_logs, 2);
    assert_eq!(config.policy.min_operators, 2);
    assert_eq!(
        config.policy.accepted_states,
        vec![LogState::Usable, LogState::Qualified]
    );

    assert!(!config.metrics.enabled);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_store_from_test_config() {
    let config = Config::from_file(Path::new("tests/test_config.toml")).unwrap();
    let store = LogStore::from_config(&config);

    assert!(store.has_policy());
    assert_eq!(store.check_interval(), Duration::from_secs(300));
    assert_eq!(store.state(), LogStoreState::Uninitialized);
}
