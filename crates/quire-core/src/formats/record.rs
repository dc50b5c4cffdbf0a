//! # Page Record Format
//!
//! Binary serialization for stored page revisions.
//!
//! Format: Header (5 bytes) + postcard-serialized `PageRecord`.
//! - 4 bytes: Magic ("QUIR")
//! - 1 byte: Version
//!
//! The payload size is checked against `MAX_RECORD_PAYLOAD_SIZE` and the
//! header is validated before any payload decoding happens.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES, MAX_RECORD_PAYLOAD_SIZE};
use crate::{QuireError, Revision};
use serde::{Deserialize, Serialize};

/// Size of the record header in bytes.
const HEADER_SIZE: usize = 5;

// =============================================================================
// RECORD
// =============================================================================

/// The stored form of a page's current revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Monotonic revision number, starting at 1.
    pub revision: u64,
    /// Whether the page is flagged as a redirect.
    pub is_redirect: bool,
    /// Wikitext of the revision.
    pub text: String,
}

impl PageRecord {
    /// Create a record for the given revision number.
    #[must_use]
    pub fn new(revision: u64, text: impl Into<String>, is_redirect: bool) -> Self {
        Self {
            revision,
            is_redirect,
            text: text.into(),
        }
    }

    /// The revision as seen by the resolver.
    #[must_use]
    pub fn to_revision(&self) -> Revision {
        Revision {
            text: self.text.clone(),
            is_redirect: self.is_redirect,
        }
    }
}

// =============================================================================
// HEADER
// =============================================================================

/// The header every record starts with: magic, then the format version.
fn header() -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[..MAGIC_BYTES.len()].copy_from_slice(MAGIC_BYTES);
    bytes[HEADER_SIZE - 1] = FORMAT_VERSION;
    bytes
}

/// Check the header of a stored record and return its payload.
fn split_header(bytes: &[u8]) -> Result<&[u8], QuireError> {
    let (head, payload) = bytes.split_at_checked(HEADER_SIZE).ok_or_else(|| {
        QuireError::Serialization("Record shorter than its header".to_string())
    })?;
    if !head.starts_with(MAGIC_BYTES) {
        return Err(QuireError::Serialization("Not a page record".to_string()));
    }
    let version = head[HEADER_SIZE - 1];
    if version != FORMAT_VERSION {
        return Err(QuireError::Serialization(format!(
            "Unsupported record version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    Ok(payload)
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a record to bytes (header + payload).
pub fn record_to_bytes(record: &PageRecord) -> Result<Vec<u8>, QuireError> {
    let payload =
        postcard::to_stdvec(record).map_err(|e| QuireError::Serialization(e.to_string()))?;
    if payload.len() > MAX_RECORD_PAYLOAD_SIZE {
        return Err(QuireError::Serialization(format!(
            "Record size {} bytes exceeds maximum allowed {} bytes",
            payload.len(),
            MAX_RECORD_PAYLOAD_SIZE
        )));
    }

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a record from bytes.
///
/// Size and header are validated before the payload is decoded.
pub fn record_from_bytes(bytes: &[u8]) -> Result<PageRecord, QuireError> {
    let payload = split_header(bytes)?;
    if payload.len() > MAX_RECORD_PAYLOAD_SIZE {
        return Err(QuireError::Serialization(format!(
            "Record size {} bytes exceeds maximum allowed {} bytes",
            payload.len(),
            MAX_RECORD_PAYLOAD_SIZE
        )));
    }

    postcard::from_bytes(payload).map_err(|e| {
        QuireError::Serialization(format!("Failed to deserialize page record: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
