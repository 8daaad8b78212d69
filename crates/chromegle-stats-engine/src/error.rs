//! Error types for the statistics engine.
//!
//! This module defines all errors that can occur while recording events and
//! serving statistics.

use chromegle_stats_core::CoreError;
use chromegle_stats_store::StoreError;
use thiserror::Error;

/// A result type using `StatsError`.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The request was rejected before any state was touched.
    #[error("validation error: {0}")]
    Validation(#[from] CoreError),

    /// The backing store was unreachable or a query failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A sub-query of snapshot assembly failed; no partial snapshot is produced.
    #[error("aggregation failed: {0}")]
    Aggregation(#[source] StoreError),

    /// The geolocation lookup failed or returned an unusable payload.
    #[error("geolocation lookup failed for {address}: {reason}")]
    Geolocation {
        /// The address being located.
        address: String,
        /// Why the lookup failed.
        reason: String,
    },
}
