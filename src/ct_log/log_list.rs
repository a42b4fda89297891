// src/ct_log/log_list.rs
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use chrono::DateTime;
use tracing::debug;

use super::key::LogPublicKey;
use super::types::{
    LogId, LogInfo, LogListDocument, LogListV3, LogState, StateTimestamp, WireLog, WireTimestamp,
};
use crate::error::ParseError;

/// Parse a log list document.
///
/// Every log entry must carry a public key whose SHA-256 equals its declared
/// `log_id`. Any failure rejects the whole document.
pub fn parse(raw: &[u8]) -> Result<LogListDocument, ParseError> {
    let log_list: LogListV3 = serde_json::from_slice(raw)?;

    let (major_version, minor_version) = parse_version(&log_list.version);
    let timestamp = parse_timestamp(&log_list.log_list_timestamp)?;

    let mut logs: HashMap<LogId, LogInfo> = HashMap::new();

    for operator in log_list.operators {
        let operator_name = operator.name;
        for log in operator.logs {
            let info = parse_log(&operator_name, log)?;

            match logs.entry(info.id()) {
                Entry::Occupied(entry) => {
                    return Err(ParseError::DuplicateLogId(*entry.key()));
                }
                Entry::Vacant(entry) => {
                    debug!(
                        "Parsed {} log: {} ({}) operated by {}",
                        info.state(),
                        info.description(),
                        info.url(),
                        info.operator()
                    );
                    entry.insert(info);
                }
            }
        }
    }

    debug!(
        "Parsed log list v{}.{} with {} logs",
        major_version,
        minor_version,
        logs.len()
    );

    Ok(LogListDocument::new(
        major_version,
        minor_version,
        timestamp,
        logs,
    ))
}

/// Split `"major.minor"` on the first dot; each half falls back to 0
pub fn parse_version(version: &str) -> (u32, u32) {
    match version.split_once('.') {
        Some((major, minor)) => (major.parse().unwrap_or(0), minor.parse().unwrap_or(0)),
        None => (version.parse().unwrap_or(0), 0),
    }
}

fn parse_log(operator: &str, log: WireLog) -> Result<LogInfo, ParseError> {
    let public_key = LogPublicKey::from_base64(&log.key)?;

    let (state, state_timestamp) = match &log.state {
        Some(states) => parse_state(states)?,
        None => (LogState::Unknown, 0),
    };

    let declared = base64::engine::general_purpose::STANDARD
        .decode(log.log_id.trim())
        .map_err(|source| ParseError::Base64 {
            field: "log_id",
            source,
        })?;

    let info = LogInfo::new(
        log.description,
        public_key,
        log.url,
        operator.to_string(),
        state,
        state_timestamp,
    );

    // The id derived from the key must match what the list claims
    if info.id().as_bytes()[..] != declared[..] {
        return Err(ParseError::LogIdMismatch {
            declared: log.log_id,
            computed: info.id(),
        });
    }

    Ok(info)
}

fn parse_state(states: &BTreeMap<String, StateTimestamp>) -> Result<(LogState, i64), ParseError> {
    let mut entries = states.iter();
    match (entries.next(), entries.next()) {
        (Some((name, entry)), None) => {
            let state = LogState::from_wire(name)
                .ok_or_else(|| ParseError::UnknownState(name.clone()))?;
            Ok((state, parse_timestamp(&entry.timestamp)?))
        }
        _ => Err(ParseError::AmbiguousState(states.len())),
    }
}

fn parse_timestamp(timestamp: &WireTimestamp) -> Result<i64, ParseError> {
    match timestamp {
        WireTimestamp::Millis(millis) => Ok(*millis),
        WireTimestamp::Rfc3339(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.timestamp_millis())
            .map_err(|_| ParseError::Timestamp(text.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sha2::{Digest, Sha256};

    const KEY_A: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEft5ACrsybbV35ScisoohFI9g+7o4QaOt+mkq0uL7tSjffpt2YhcVw7C6rUIGb4Z2/Y1v2MNwDutg8ujNT0+0Qw==";
    const KEY_B: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEh/XMP1S/ghvWffg+97RD9pnwKg2yj4E7X3eE+Eov60dib9MaSGpxyXXP8ppS02y2yVSbh2FziEc8hjPko4Ffhg==";

    fn log_id_of(key: &str) -> String {
        let engine = base64::engine::general_purpose::STANDARD;
        let der = engine.decode(key).unwrap();
        engine.encode(Sha256::digest(&der))
    }

    fn log_entry(description: &str, key: &str, state: serde_json::Value) -> serde_json::Value {
        json!({
            "description": description,
            "key": key,
            "url": format!("https://{}.example.com/", description),
            "log_id": log_id_of(key),
            "mmd": 86400,
            "state": state,
        })
    }

    fn document(version: &str, logs: Vec<serde_json::Value>) -> Vec<u8> {
        json!({
            "version": version,
            "log_list_timestamp": 1_700_000_000_000i64,
            "operators": [
                { "name": "Operator One", "email": ["ct@example.com"], "logs": logs },
            ],
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_parse_valid_document() {
        let raw = document(
            "3.2",
            vec![
                log_entry(
                    "alpha",
                    KEY_A,
                    json!({ "usable": { "timestamp": 1_600_000_000_000i64 } }),
                ),
                log_entry(
                    "beta",
                    KEY_B,
                    json!({ "retired": { "timestamp": "2023-01-01T00:00:00Z" } }),
                ),
            ],
        );

        let doc = parse(&raw).unwrap();
        assert_eq!(doc.major_version(), 3);
        assert_eq!(doc.minor_version(), 2);
        assert_eq!(doc.timestamp(), 1_700_000_000_000);
        assert_eq!(doc.len(), 2);

        let alpha = doc
            .logs()
            .values()
            .find(|log| log.description() == "alpha")
            .unwrap();
        assert_eq!(alpha.state(), LogState::Usable);
        assert_eq!(alpha.state_timestamp(), 1_600_000_000_000);
        assert_eq!(alpha.operator(), "Operator One");
        assert_eq!(alpha.url(), "https://alpha.example.com/");
        assert_eq!(alpha.id().to_base64(), log_id_of(KEY_A));

        let beta = doc
            .logs()
            .values()
            .find(|log| log.description() == "beta")
            .unwrap();
        assert_eq!(beta.state(), LogState::Retired);
        assert_eq!(beta.state_timestamp(), 1_672_531_200_000);
    }

    #[test]
    fn test_missing_state_is_unknown() {
        let raw = document("1.0", vec![log_entry("alpha", KEY_A, serde_json::Value::Null)]);
        let doc = parse(&raw).unwrap();
        let log = doc.logs().values().next().unwrap();
        assert_eq!(log.state(), LogState::Unknown);
        assert_eq!(log.state_timestamp(), 0);
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(parse_version("3.2"), (3, 2));
        assert_eq!(parse_version("5"), (5, 0));
        assert_eq!(parse_version("x.y"), (0, 0));
        assert_eq!(parse_version("7.z"), (7, 0));
        assert_eq!(parse_version("q.4"), (0, 4));
        assert_eq!(parse_version(""), (0, 0));
        assert_eq!(parse_version("1.2.3"), (1, 0));
    }

    #[test]
    fn test_log_id_mismatch_rejects_document() {
        let mut forged = log_entry("beta", KEY_B, json!({ "usable": { "timestamp": 0 } }));
        forged["log_id"] = json!(log_id_of(KEY_A));

        let raw = document(
            "1.0",
            vec![log_entry("alpha", KEY_A, json!({ "usable": { "timestamp": 0 } })), forged],
        );

        assert!(matches!(parse(&raw), Err(ParseError::LogIdMismatch { .. })));
    }

    #[test]
    fn test_unknown_state_rejects_document() {
        let raw = document(
            "1.0",
            vec![log_entry("alpha", KEY_A, json!({ "Usable": { "timestamp": 0 } }))],
        );
        assert!(matches!(parse(&raw), Err(ParseError::UnknownState(name)) if name == "Usable"));
    }

    #[test]
    fn test_state_object_must_have_one_entry() {
        let empty = document("1.0", vec![log_entry("alpha", KEY_A, json!({}))]);
        assert!(matches!(parse(&empty), Err(ParseError::AmbiguousState(0))));

        let two = document(
            "1.0",
            vec![log_entry(
                "alpha",
                KEY_A,
                json!({ "usable": { "timestamp": 0 }, "retired": { "timestamp": 1 } }),
            )],
        );
        assert!(matches!(parse(&two), Err(ParseError::AmbiguousState(2))));
    }

    #[test]
    fn test_duplicate_log_rejects_document() {
        let raw = document(
            "1.0",
            vec![
                log_entry("alpha", KEY_A, json!({ "usable": { "timestamp": 0 } })),
                log_entry("alpha-again", KEY_A, json!({ "usable": { "timestamp": 0 } })),
            ],
        );
        assert!(matches!(parse(&raw), Err(ParseError::DuplicateLogId(_))));
    }

    #[test]
    fn test_bad_log_id_base64() {
        let mut entry = log_entry("alpha", KEY_A, serde_json::Value::Null);
        entry["log_id"] = json!("***");
        let raw = document("1.0", vec![entry]);
        assert!(matches!(parse(&raw), Err(ParseError::Base64 { field: "log_id", .. })));
    }

    #[test]
    fn test_bad_key_rejects_document() {
        let mut entry = log_entry("alpha", KEY_A, serde_json::Value::Null);
        entry["key"] = json!("AAAA");
        let raw = document("1.0", vec![entry]);
        assert!(matches!(parse(&raw), Err(ParseError::PublicKey(_))));
    }

    #[test]
    fn test_schema_violations() {
        assert!(matches!(parse(b"not json"), Err(ParseError::Json(_))));
        assert!(matches!(parse(b"{}"), Err(ParseError::Json(_))));

        let missing_url = json!({
            "version": "1.0",
            "log_list_timestamp": 0,
            "operators": [{ "name": "op", "logs": [{
                "description": "alpha",
                "key": KEY_A,
                "log_id": log_id_of(KEY_A),
            }]}],
        });
        assert!(parse(missing_url.to_string().as_bytes()).is_err());
    }

    #[test]
    fn test_bad_timestamp() {
        let raw = json!({
            "version": "1.0",
            "log_list_timestamp": "yesterday",
            "operators": [],
        });
        assert!(matches!(
            parse(raw.to_string().as_bytes()),
            Err(ParseError::Timestamp(_))
        ));
    }
}
