//! Error types for log list loading.
//!
//! None of these cross the [`LogStore`](crate::ct_log::LogStore) boundary: the
//! store folds them into a [`LogStoreState`](crate::ct_log::LogStoreState).

use crate::ct_log::types::LogId;

/// Reasons a log list document is rejected as malformed.
///
/// Parsing is all-or-nothing, so any of these discards the whole document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Not JSON, or JSON that does not follow the log list schema.
    #[error("invalid log list document: {0}")]
    Json(#[from] serde_json::Error),

    /// A base64 field could not be decoded.
    #[error("invalid base64 in {field}: {source}")]
    Base64 {
        /// Name of the offending field.
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The public key could not be parsed as a SubjectPublicKeyInfo.
    #[error("unparsable public key: {0}")]
    PublicKey(String),

    /// The declared `log_id` is not the SHA-256 of the log's public key.
    #[error("log_id {declared} does not match public key hash {computed}")]
    LogIdMismatch {
        /// The `log_id` value as it appears in the document.
        declared: String,
        /// The id derived from the public key.
        computed: LogId,
    },

    /// A state name outside the known set.
    #[error("unknown log state: {0:?}")]
    UnknownState(String),

    /// A state object must name exactly one state.
    #[error("log state object must have exactly one entry, found {0}")]
    AmbiguousState(usize),

    /// A timestamp that is neither epoch millis nor RFC 3339.
    #[error("invalid timestamp: {0:?}")]
    Timestamp(String),

    /// Two entries derive the same log id.
    #[error("duplicate log id {0}")]
    DuplicateLogId(LogId),
}

/// Failure to produce a document from a log list source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The source is missing or unreadable.
    #[error("log list unavailable: {0}")]
    SourceUnavailable(#[from] std::io::Error),

    /// The source was read but its content was rejected.
    #[error("malformed log list: {0}")]
    Malformed(#[from] ParseError),
}
