// src/ct_log/types.rs
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::key::LogPublicKey;

/// Length of a log id in bytes (SHA-256 output)
pub const LOG_ID_LEN: usize = 32;

/// Identifier of a CT log: SHA-256 of the log's DER public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LogId([u8; LOG_ID_LEN]);

impl LogId {
    /// Derive the id from a DER SubjectPublicKeyInfo
    pub fn from_key_der(der: &[u8]) -> Self {
        let digest = Sha256::digest(der);
        let mut id = [0u8; LOG_ID_LEN];
        id.copy_from_slice(&digest);
        Self(id)
    }

    /// Returns `None` unless `bytes` is exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; LOG_ID_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; LOG_ID_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }
}

impl From<[u8; LOG_ID_LEN]> for LogId {
    fn from(bytes: [u8; LOG_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogId({})", hex::encode(self.0))
    }
}

/// Operational state of a single CT log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogState {
    Pending,
    Qualified,
    Usable,
    Readonly,
    Retired,
    Rejected,
    #[default]
    Unknown,
}

impl LogState {
    /// Exact, case-sensitive mapping from the name used in log lists
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(LogState::Pending),
            "qualified" => Some(LogState::Qualified),
            "usable" => Some(LogState::Usable),
            "readonly" => Some(LogState::Readonly),
            "retired" => Some(LogState::Retired),
            "rejected" => Some(LogState::Rejected),
            "unknown" => Some(LogState::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogState::Pending => "pending",
            LogState::Qualified => "qualified",
            LogState::Usable => "usable",
            LogState::Readonly => "readonly",
            LogState::Retired => "retired",
            LogState::Rejected => "rejected",
            LogState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trusted CT log as described by the log list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogInfo {
    id: LogId,
    description: String,
    public_key: LogPublicKey,
    url: String,
    operator: String,
    state: LogState,
    state_timestamp: i64,
}

impl LogInfo {
    /// The id is always derived from `public_key`
    pub fn new(
        description: String,
        public_key: LogPublicKey,
        url: String,
        operator: String,
        state: LogState,
        state_timestamp: i64,
    ) -> Self {
        Self {
            id: public_key.log_id(),
            description,
            public_key,
            url,
            operator,
            state,
            state_timestamp,
        }
    }

    pub fn id(&self) -> LogId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn public_key(&self) -> &LogPublicKey {
        &self.public_key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn state(&self) -> LogState {
        self.state
    }

    /// Epoch millis at which `state` became effective (0 when unknown)
    pub fn state_timestamp(&self) -> i64 {
        self.state_timestamp
    }
}

/// A fully parsed log list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogListDocument {
    major_version: u32,
    minor_version: u32,
    timestamp: i64,
    logs: HashMap<LogId, LogInfo>,
}

impl LogListDocument {
    pub fn new(
        major_version: u32,
        minor_version: u32,
        timestamp: i64,
        logs: HashMap<LogId, LogInfo>,
    ) -> Self {
        Self {
            major_version,
            minor_version,
            timestamp,
            logs,
        }
    }

    pub fn major_version(&self) -> u32 {
        self.major_version
    }

    pub fn minor_version(&self) -> u32 {
        self.minor_version
    }

    /// Publication time of the list in epoch millis
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn logs(&self) -> &HashMap<LogId, LogInfo> {
        &self.logs
    }

    pub fn get(&self, id: &LogId) -> Option<&LogInfo> {
        self.logs.get(id)
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// Log list V3 format as published on disk
#[derive(Debug, Deserialize)]
pub(crate) struct LogListV3 {
    pub version: String,
    pub log_list_timestamp: WireTimestamp,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Operator {
    pub name: String,
    pub logs: Vec<WireLog>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLog {
    pub description: String,
    pub key: String,
    pub url: String,
    pub log_id: String,
    /// Keyed by state name, exactly one entry expected
    #[serde(default)]
    pub state: Option<BTreeMap<String, StateTimestamp>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StateTimestamp {
    pub timestamp: WireTimestamp,
}

/// Timestamps appear either as epoch millis or as RFC 3339 strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireTimestamp {
    Millis(i64),
    Rfc3339(String),
}
