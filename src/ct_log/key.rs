// src/ct_log/key.rs
use std::fmt;

use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;
use x509_parser::x509::SubjectPublicKeyInfo;

use super::types::LogId;
use crate::error::ParseError;

const PEM_LABEL: &str = "PUBLIC KEY";

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_ED25519: &str = "1.3.101.112";

/// Algorithm family of a log's public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Ec,
    Ed25519,
    /// Any other algorithm, identified by its dotted OID
    Other(String),
}

impl KeyAlgorithm {
    fn from_oid(oid: &str) -> Self {
        match oid {
            OID_RSA_ENCRYPTION => KeyAlgorithm::Rsa,
            OID_EC_PUBLIC_KEY => KeyAlgorithm::Ec,
            OID_ED25519 => KeyAlgorithm::Ed25519,
            other => KeyAlgorithm::Other(other.to_string()),
        }
    }
}

/// Parsed public key of a CT log.
///
/// Holds the DER SubjectPublicKeyInfo exactly as it was decoded; the log id
/// is the SHA-256 of these bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct LogPublicKey {
    der: Vec<u8>,
    algorithm: KeyAlgorithm,
}

impl LogPublicKey {
    /// Parse a PEM `PUBLIC KEY` block
    pub fn from_pem(pem: &[u8]) -> Result<Self, ParseError> {
        let (_, pem) = parse_x509_pem(pem)
            .map_err(|e| ParseError::PublicKey(format!("invalid PEM: {:?}", e)))?;

        if pem.label != PEM_LABEL {
            return Err(ParseError::PublicKey(format!(
                "unexpected PEM label {:?}",
                pem.label
            )));
        }

        Self::from_der(&pem.contents)
    }

    /// Wrap bare base64 key material (as found in log lists) in a PEM block
    /// and parse it
    pub fn from_base64(key: &str) -> Result<Self, ParseError> {
        let pem = format!(
            "-----BEGIN {PEM_LABEL}-----\n{}\n-----END {PEM_LABEL}-----\n",
            key.trim()
        );
        Self::from_pem(pem.as_bytes())
    }

    /// Parse a DER-encoded SubjectPublicKeyInfo
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let (rest, spki) = SubjectPublicKeyInfo::from_der(der)
            .map_err(|e| ParseError::PublicKey(format!("invalid SubjectPublicKeyInfo: {:?}", e)))?;

        if !rest.is_empty() {
            return Err(ParseError::PublicKey(format!(
                "{} trailing bytes after SubjectPublicKeyInfo",
                rest.len()
            )));
        }

        // Rejects RSA/EC bodies that do not decode
        spki.parsed()
            .map_err(|e| ParseError::PublicKey(format!("invalid key material: {:?}", e)))?;

        let algorithm = KeyAlgorithm::from_oid(&spki.algorithm.algorithm.to_id_string());

        Ok(Self {
            der: spki.raw.to_vec(),
            algorithm,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    /// RFC 6962 log id: SHA-256 over the DER encoding
    pub fn log_id(&self) -> LogId {
        LogId::from_key_der(&self.der)
    }
}

impl fmt::Debug for LogPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogPublicKey")
            .field("algorithm", &self.algorithm)
            .field("log_id", &self.log_id())
            .finish()
    }
}
