//! `RocksDB` storage layer for chromegle-stats.
//!
//! This crate provides durable storage for the identity registry, per-identity
//! activity records, and the daily counter ledger using `RocksDB` with column
//! families.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `registry`: Pseudonym to surrogate identity id, unique by pseudonym
//! - `activity`: One record per identity holding the last timestamp per category
//! - `ledger`: One row per calendar day holding a counter per category
//! - `meta`: The identity id high-water mark
//!
//! Activity and ledger rows are only ever written through merge operators, so
//! concurrent writers never race on a read-then-write.
//!
//! # Example
//!
//! ```no_run
//! use chromegle_stats_store::{RocksStore, Store};
//! use chromegle_stats_core::Category;
//! use chrono::NaiveDate;
//!
//! let store = RocksStore::open("/tmp/chromegle-stats-db").unwrap();
//!
//! let day = NaiveDate::from_ymd_opt(2022, 7, 4).unwrap();
//! store.increment_counter(day, Category::AppOpened).unwrap();
//! let totals = store.sum_counters_between(day, day).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod merge;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{ActivityRecord, DailyCounters};

use chrono::{DateTime, NaiveDate, Utc};
use chromegle_stats_core::{Category, CategoryTotals, IdentityId, Pseudonym};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, instrumented wrappers for testing). Every method is one
/// logical operation and holds no handle beyond its own return.
pub trait Store: Send + Sync {
    // =========================================================================
    // Identity Operations
    // =========================================================================

    /// Look up the identity registered for a pseudonym.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_identity(&self, pseudonym: &Pseudonym) -> Result<Option<IdentityId>>;

    /// Register a new identity for a pseudonym.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the pseudonym is already registered or a
    /// concurrent registration of the same pseudonym committed first.
    fn insert_identity(&self, pseudonym: &Pseudonym) -> Result<IdentityId>;

    /// Count registered identities.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_identities(&self) -> Result<u64>;

    // =========================================================================
    // Activity Operations
    // =========================================================================

    /// Set the timestamp of one category on an identity's activity record.
    ///
    /// Creates the record if absent. Other categories are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn upsert_activity(
        &self,
        identity_id: IdentityId,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Get an identity's activity record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_activity(&self, identity_id: IdentityId) -> Result<Option<ActivityRecord>>;

    /// List identities whose `category` timestamp is at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_active_since(&self, category: Category, since: DateTime<Utc>)
        -> Result<Vec<IdentityId>>;

    /// List active identities for every category in a single pass.
    ///
    /// Entry `i` holds the identities for the category whose
    /// [`Category::index`] is `i`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_active_since_all(&self, since: DateTime<Utc>) -> Result<[Vec<IdentityId>; 3]>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Atomically add one to a category counter for a day.
    ///
    /// A missing day row is created with all counters at zero first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn increment_counter(&self, day: NaiveDate, category: Category) -> Result<()>;

    /// Get the counter row for a day.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_counters(&self, day: NaiveDate) -> Result<Option<DailyCounters>>;

    /// Sum counter rows from `start` to `end`, both inclusive.
    ///
    /// Returns zero totals for an empty or inverted range.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn sum_counters_between(&self, start: NaiveDate, end: NaiveDate) -> Result<CategoryTotals>;

    /// Sum every counter row ever written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn sum_all_counters(&self) -> Result<CategoryTotals>;
}
