// src/ct_log/policy.rs
use std::collections::HashSet;

use super::store::LogStoreSnapshot;
use super::types::LogState;
use crate::config::PolicyConfig;

/// Decides whether the known log set is sufficient for SCT-based trust.
///
/// Implementations must be deterministic for a given snapshot and must not
/// perform I/O. They are called with the store lock held.
pub trait CompliancePolicy: Send + Sync {
    fn is_compliant(&self, snapshot: &LogStoreSnapshot) -> bool;
}

impl<F> CompliancePolicy for F
where
    F: Fn(&LogStoreSnapshot) -> bool + Send + Sync,
{
    fn is_compliant(&self, snapshot: &LogStoreSnapshot) -> bool {
        self(snapshot)
    }
}

/// Requires a minimum number of acceptable logs spread across a minimum
/// number of distinct operators
#[derive(Debug, Clone)]
pub struct MinimumLogsPolicy {
    min_logs: usize,
    min_operators: usize,
    accepted_states: Vec<LogState>,
}

impl MinimumLogsPolicy {
    pub fn new(min_logs: usize, min_operators: usize, accepted_states: Vec<LogState>) -> Self {
        Self {
            min_logs,
            min_operators,
            accepted_states,
        }
    }
}

impl Default for MinimumLogsPolicy {
    fn default() -> Self {
        Self::new(2, 2, vec![LogState::Usable, LogState::Qualified])
    }
}

impl From<&PolicyConfig> for MinimumLogsPolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self::new(
            config.min_logs,
            config.min_operators,
            config.accepted_states.clone(),
        )
    }
}

impl CompliancePolicy for MinimumLogsPolicy {
    fn is_compliant(&self, snapshot: &LogStoreSnapshot) -> bool {
        let mut count = 0;
        let mut operators = HashSet::new();

        for log in snapshot.logs() {
            if self.accepted_states.contains(&log.state()) {
                count += 1;
                operators.insert(log.operator());
            }
        }

        count >= self.min_logs && operators.len() >= self.min_operators
    }
}
