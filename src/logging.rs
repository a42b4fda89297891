// src/logging.rs
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const FALLBACK_LEVEL: &str = "info";

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. A configured level that does
/// not parse falls back to `info`. Fails if a global subscriber is already
/// installed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&config.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("Invalid log level {:?} ({}), using {}", level, e, FALLBACK_LEVEL);
        EnvFilter::new(FALLBACK_LEVEL)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_configured_level() {
        assert_eq!(level_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_invalid_level_falls_back_to_info() {
        assert_eq!(
            level_filter("ct_logstore=loud").max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }

    #[test]
    fn test_second_install_fails() {
        let config = LoggingConfig::default();
        // The first call may lose to a subscriber installed by another test
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
