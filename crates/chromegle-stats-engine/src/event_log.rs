//! Per-identity activity log.
//!
//! Keeps only the most recent timestamp of each category per identity. The
//! upsert is a single storage-level merge keyed by identity id, so concurrent
//! events for the same identity resolve last-write-wins in commit order.

use chrono::{DateTime, Utc};
use chromegle_stats_core::{Category, IdentityId, Pseudonym};
use chromegle_stats_store::Store;

use crate::error::Result;
use crate::identity;

/// Record an event on the identity's activity record.
///
/// The category is already validated by its type; only its own timestamp
/// column changes.
///
/// # Errors
///
/// Returns `StatsError::Storage` if identity resolution or the upsert fails.
pub fn record_event<S: Store>(
    store: &S,
    pseudonym: &Pseudonym,
    category: Category,
    at: DateTime<Utc>,
) -> Result<IdentityId> {
    let identity_id = identity::resolve_or_create(store, pseudonym)?;
    store.upsert_activity(identity_id, category, at)?;

    tracing::debug!(
        identity_id = %identity_id,
        category = %category,
        "Recorded activity"
    );

    Ok(identity_id)
}
