//! Daily counter ledger.
//!
//! One row per calendar day, one counter per category. Rows are created on the
//! first event of the day and only ever incremented by the storage-level add.

use chrono::{DateTime, Local, NaiveDate, Utc};
use chromegle_stats_core::Category;
use chromegle_stats_store::Store;

use crate::error::Result;

/// The ledger day an instant belongs to, by the server-local calendar.
#[must_use]
pub fn day_of(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Increment the category counter for a day.
///
/// # Errors
///
/// Returns `StatsError::Storage` if the store fails.
pub fn increment<S: Store>(store: &S, category: Category, day: NaiveDate) -> Result<()> {
    store.increment_counter(day, category)?;
    tracing::debug!(category = %category, day = %day, "Incremented daily counter");
    Ok(())
}
