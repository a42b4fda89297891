// src/ct_log/mod.rs
pub mod clock;
pub mod key;
pub mod log_list;
pub mod policy;
pub mod source;
pub mod store;
pub mod types;

pub use clock::{Clock, FakeClock, SystemClock};
pub use key::{KeyAlgorithm, LogPublicKey};
pub use policy::{CompliancePolicy, MinimumLogsPolicy};
pub use source::{FileLogListSource, LogListSource};
pub use store::{
    COMPAT_VERSION, DEFAULT_CHECK_INTERVAL, LogStore, LogStoreBuilder, LogStoreSnapshot,
    LogStoreState,
};
pub use types::{LOG_ID_LEN, LogId, LogInfo, LogListDocument, LogState};
