//! `RocksDB` merge operators for activity, ledger and sequence rows.
//!
//! Every operator is associative, so `RocksDB` may combine operands in any
//! grouping during compaction. Writers only ever submit operands; nobody reads
//! a row to write it back, which keeps concurrent updates atomic in the engine.

use rocksdb::MergeOperands;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::types::{ActivityRecord, DailyCounters};

/// Serialize a value using CBOR.
pub(crate) fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Overlay partial activity records, later operands winning per column.
///
/// Returning `None` makes `RocksDB` report a corruption error for the key.
pub fn activity_overlay(
    key: &[u8],
    existing: Option<&[u8]>,
    operands: &MergeOperands,
) -> Option<Vec<u8>> {
    let mut record = match existing {
        Some(data) => decode_or_log::<ActivityRecord>(key, data)?,
        None => ActivityRecord::default(),
    };

    for operand in operands {
        let update = decode_or_log::<ActivityRecord>(key, operand)?;
        record.overlay(&update);
    }

    serialize(&record).ok()
}

/// Sum daily counter rows. An absent row starts from zero.
pub fn ledger_sum(
    key: &[u8],
    existing: Option<&[u8]>,
    operands: &MergeOperands,
) -> Option<Vec<u8>> {
    let mut counters = match existing {
        Some(data) => decode_or_log::<DailyCounters>(key, data)?,
        None => DailyCounters::default(),
    };

    for operand in operands {
        let delta = decode_or_log::<DailyCounters>(key, operand)?;
        counters.accumulate(&delta);
    }

    serialize(&counters).ok()
}

/// Keep the highest identity sequence seen. Values are big-endian `u64`.
pub fn sequence_max(
    key: &[u8],
    existing: Option<&[u8]>,
    operands: &MergeOperands,
) -> Option<Vec<u8>> {
    let mut highest = match existing {
        Some(data) => decode_sequence_or_log(key, data)?,
        None => 0,
    };

    for operand in operands {
        highest = highest.max(decode_sequence_or_log(key, operand)?);
    }

    Some(keys::encode_sequence(highest).to_vec())
}

fn decode_sequence_or_log(key: &[u8], data: &[u8]) -> Option<u64> {
    match keys::decode_sequence(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(key = ?String::from_utf8_lossy(key), error = %e, "Sequence operand decode failed");
            None
        }
    }
}

fn decode_or_log<T: serde::de::DeserializeOwned>(key: &[u8], data: &[u8]) -> Option<T> {
    match deserialize(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(key = ?String::from_utf8_lossy(key), error = %e, "Merge operand decode failed");
            None
        }
    }
}
