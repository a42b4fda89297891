// src/lib.rs
// Library interface for ct-logstore
pub mod config;
pub mod context;
pub mod ct_log;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod watcher;

pub use context::LogStoreContext;
pub use ct_log::{LogId, LogInfo, LogStore, LogStoreState};
pub use error::{LoadError, ParseError};
