//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Pseudonym to surrogate identity id, keyed by the 32 pseudonym bytes.
    pub const REGISTRY: &str = "registry";

    /// Activity records, keyed by `identity_id` (big-endian).
    pub const ACTIVITY: &str = "activity";

    /// Daily counter rows, keyed by the `YYYYMMDD` calendar day.
    pub const LEDGER: &str = "ledger";

    /// Bookkeeping values such as the identity sequence.
    pub const META: &str = "meta";
}

/// Merge operator names. Changing a name makes existing databases unreadable.
pub mod merge {
    /// Overlays partial activity records.
    pub const ACTIVITY: &str = "chromegle.activity_overlay.v1";

    /// Sums daily counter rows.
    pub const LEDGER: &str = "chromegle.ledger_sum.v1";

    /// Keeps the highest identity sequence.
    pub const SEQUENCE: &str = "chromegle.sequence_max.v1";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::REGISTRY, cf::ACTIVITY, cf::LEDGER, cf::META]
}
