//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions to encode and decode keys for the column families.
//! Activity and ledger keys are fixed-width and order-preserving so that range
//! scans follow numeric and chronological order.

use chrono::NaiveDate;
use chromegle_stats_core::{IdentityId, Pseudonym};

use crate::error::{Result, StoreError};

/// Key of the identity sequence in the `meta` column family.
pub const IDENTITY_SEQUENCE: &[u8] = b"identity_sequence";

/// Encode a registry key (just the pseudonym bytes).
#[must_use]
pub fn registry_key(pseudonym: &Pseudonym) -> Vec<u8> {
    pseudonym.as_bytes().to_vec()
}

/// Encode an activity key: big-endian `identity_id`.
#[must_use]
pub fn activity_key(identity_id: IdentityId) -> [u8; 8] {
    identity_id.to_be_bytes()
}

/// Extract the identity ID from an activity key.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the key is not 8 bytes.
pub fn extract_identity_id(key: &[u8]) -> Result<IdentityId> {
    IdentityId::from_be_slice(key).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Encode a ledger key: the calendar day as ASCII `YYYYMMDD`.
#[must_use]
pub fn day_key(day: NaiveDate) -> Vec<u8> {
    day.format("%Y%m%d").to_string().into_bytes()
}

/// Encode a sequence value.
#[must_use]
pub fn encode_sequence(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Decode a sequence or registry value.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the value is not 8 bytes.
pub fn decode_sequence(value: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = value
        .try_into()
        .map_err(|_| StoreError::Serialization(format!("invalid sequence length {}", value.len())))?;
    Ok(u64::from_be_bytes(arr))
}
