//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chromegle_stats_core::{Category, CategoryTotals, IdentityId, Pseudonym};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode, MultiThreaded,
    OptimisticTransactionDB, Options,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::merge::{self, deserialize, serialize};
use crate::schema::{self, all_column_families, cf};
use crate::types::{ActivityRecord, DailyCounters};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<OptimisticTransactionDB<MultiThreaded>>,
    /// Highest identity id handed out. The database is owned by one process,
    /// so ids are allocated here and only persisted through the `meta` row.
    sequence: AtomicU64,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Self::column_family_options(name)))
            .collect();

        let db = OptimisticTransactionDB::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let sequence = {
            let cf_meta = db
                .cf_handle(cf::META)
                .ok_or_else(|| StoreError::Database(format!("column family not found: {}", cf::META)))?;
            db.get_cf(&cf_meta, keys::IDENTITY_SEQUENCE)
                .map_err(|e| StoreError::Database(e.to_string()))?
                .map(|data| keys::decode_sequence(&data))
                .transpose()?
                .unwrap_or(0)
        };
        tracing::debug!(sequence, "Loaded identity sequence");

        Ok(Self {
            db: Arc::new(db),
            sequence: AtomicU64::new(sequence),
        })
    }

    fn column_family_options(name: &str) -> Options {
        let mut opts = Options::default();
        match name {
            cf::ACTIVITY => {
                opts.set_merge_operator_associative(schema::merge::ACTIVITY, merge::activity_overlay);
            }
            cf::LEDGER => {
                opts.set_merge_operator_associative(schema::merge::LEDGER, merge::ledger_sum);
            }
            cf::META => {
                opts.set_merge_operator_associative(schema::merge::SEQUENCE, merge::sequence_max);
            }
            _ => {}
        }
        opts
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Reserve the next identity id and persist the high-water mark.
    ///
    /// The mark is written before the registry row that references it, so a
    /// reopened store never hands out an id twice. Ids burned by a failed
    /// commit leave gaps.
    fn allocate_identity_id(&self) -> Result<u64> {
        let next = self
            .sequence
            .fetch_add(1, Ordering::SeqCst)
            .checked_add(1)
            .ok_or_else(|| StoreError::Database("identity sequence exhausted".to_string()))?;

        let cf_meta = self.cf(cf::META)?;
        self.db
            .merge_cf(&cf_meta, keys::IDENTITY_SEQUENCE, keys::encode_sequence(next))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(next)
    }

    /// Map a transaction error, separating optimistic conflicts from failures.
    fn map_commit_error(e: &rocksdb::Error) -> StoreError {
        match e.kind() {
            ErrorKind::Busy | ErrorKind::TryAgain => StoreError::Conflict(e.to_string()),
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Identity Operations
    // =========================================================================

    fn find_identity(&self, pseudonym: &Pseudonym) -> Result<Option<IdentityId>> {
        let cf = self.cf(cf::REGISTRY)?;
        let key = keys::registry_key(pseudonym);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| keys::decode_sequence(&data).map(IdentityId::new))
            .transpose()
    }

    fn insert_identity(&self, pseudonym: &Pseudonym) -> Result<IdentityId> {
        let cf_registry = self.cf(cf::REGISTRY)?;
        let key = keys::registry_key(pseudonym);

        let txn = self.db.transaction();

        // Only the registry key is guarded, so commits conflict on the same pseudonym alone
        let existing = txn
            .get_for_update_cf(&cf_registry, &key, true)
            .map_err(|e| Self::map_commit_error(&e))?;
        if existing.is_some() {
            return Err(StoreError::Conflict(format!(
                "pseudonym already registered: {pseudonym}"
            )));
        }

        let next = self.allocate_identity_id()?;

        txn.put_cf(&cf_registry, &key, keys::encode_sequence(next))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        txn.commit().map_err(|e| Self::map_commit_error(&e))?;

        Ok(IdentityId::new(next))
    }

    fn count_identities(&self) -> Result<u64> {
        let cf = self.cf(cf::REGISTRY)?;

        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::Database(e.to_string()))?;
            count += 1;
        }

        Ok(count)
    }

    // =========================================================================
    // Activity Operations
    // =========================================================================

    fn upsert_activity(
        &self,
        identity_id: IdentityId,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let cf = self.cf(cf::ACTIVITY)?;
        let key = keys::activity_key(identity_id);
        let operand = serialize(&ActivityRecord::single(category, at))?;

        self.db
            .merge_cf(&cf, key, operand)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_activity(&self, identity_id: IdentityId) -> Result<Option<ActivityRecord>> {
        let cf = self.cf(cf::ACTIVITY)?;
        let key = keys::activity_key(identity_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| deserialize(&data))
            .transpose()
    }

    fn list_active_since(
        &self,
        category: Category,
        since: DateTime<Utc>,
    ) -> Result<Vec<IdentityId>> {
        let cf = self.cf(cf::ACTIVITY)?;

        let mut identities = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let record: ActivityRecord = deserialize(&value)?;

            if record.active_since(category, since) {
                identities.push(keys::extract_identity_id(&key)?);
            }
        }

        Ok(identities)
    }

    fn list_active_since_all(&self, since: DateTime<Utc>) -> Result<[Vec<IdentityId>; 3]> {
        let cf = self.cf(cf::ACTIVITY)?;

        let mut active: [Vec<IdentityId>; 3] = Default::default();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let record: ActivityRecord = deserialize(&value)?;

            for category in Category::ALL {
                if record.active_since(category, since) {
                    active[category.index()].push(keys::extract_identity_id(&key)?);
                }
            }
        }

        Ok(active)
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn increment_counter(&self, day: NaiveDate, category: Category) -> Result<()> {
        let cf = self.cf(cf::LEDGER)?;
        let key = keys::day_key(day);

        let mut delta = DailyCounters::default();
        *delta.get_mut(category) = 1;
        let operand = serialize(&delta)?;

        self.db
            .merge_cf(&cf, key, operand)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_counters(&self, day: NaiveDate) -> Result<Option<DailyCounters>> {
        let cf = self.cf(cf::LEDGER)?;
        let key = keys::day_key(day);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| deserialize(&data))
            .transpose()
    }

    fn sum_counters_between(&self, start: NaiveDate, end: NaiveDate) -> Result<CategoryTotals> {
        let mut totals = CategoryTotals::default();
        if start > end {
            return Ok(totals);
        }

        let cf = self.cf(cf::LEDGER)?;
        let start_key = keys::day_key(start);
        let end_key = keys::day_key(end);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&start_key, Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop once we're past the last day
            if &*key > end_key.as_slice() {
                break;
            }

            let counters: DailyCounters = deserialize(&value)?;
            totals.accumulate(&counters);
        }

        Ok(totals)
    }

    fn sum_all_counters(&self) -> Result<CategoryTotals> {
        let cf = self.cf(cf::LEDGER)?;

        let mut totals = CategoryTotals::default();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let counters: DailyCounters = deserialize(&value)?;
            totals.accumulate(&counters);
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chromegle_stats_core::Pseudonymizer;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn pseudonym(address: &str) -> Pseudonym {
        Pseudonymizer::new("test").pseudonymize(address)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 7, d).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 7, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn identity_insert_and_find() {
        let (store, _dir) = create_test_store();
        let p = pseudonym("10.0.0.1");

        assert!(store.find_identity(&p).unwrap().is_none());

        let id = store.insert_identity(&p).unwrap();
        assert_eq!(store.find_identity(&p).unwrap(), Some(id));
        assert_eq!(store.count_identities().unwrap(), 1);
    }

    #[test]
    fn identity_duplicate_insert_conflicts() {
        let (store, _dir) = create_test_store();
        let p = pseudonym("10.0.0.1");

        let id = store.insert_identity(&p).unwrap();
        let second = store.insert_identity(&p);

        assert!(matches!(second, Err(StoreError::Conflict(_))));
        assert_eq!(store.find_identity(&p).unwrap(), Some(id));
        assert_eq!(store.count_identities().unwrap(), 1);
    }

    #[test]
    fn identity_ids_are_sequential() {
        let (store, _dir) = create_test_store();

        let a = store.insert_identity(&pseudonym("10.0.0.1")).unwrap();
        let b = store.insert_identity(&pseudonym("10.0.0.2")).unwrap();

        assert_eq!(a, IdentityId::new(1));
        assert_eq!(b, IdentityId::new(2));
    }

    #[test]
    fn identity_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let p = pseudonym("10.0.0.1");

        let id = {
            let store = RocksStore::open(dir.path()).unwrap();
            store.insert_identity(&p).unwrap()
        };

        let store = RocksStore::open(dir.path()).unwrap();
        assert_eq!(store.find_identity(&p).unwrap(), Some(id));

        // The sequence continues where it stopped
        let next = store.insert_identity(&pseudonym("10.0.0.2")).unwrap();
        assert_eq!(next.get(), id.get() + 1);
    }

    #[test]
    fn concurrent_distinct_registrations_all_succeed() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .insert_identity(&pseudonym(&format!("10.1.0.{i}")))
                        .unwrap()
                })
            })
            .collect();
        let mut ids: Vec<u64> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().get())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 32);
        assert_eq!(store.count_identities().unwrap(), 32);
    }

    #[test]
    fn sequence_never_reuses_ids_after_reopen() {
        let dir = TempDir::new().unwrap();
        let p = pseudonym("10.0.0.1");

        let highest = {
            let store = RocksStore::open(dir.path()).unwrap();
            store.insert_identity(&p).unwrap();
            assert!(store.insert_identity(&p).is_err());
            store.insert_identity(&pseudonym("10.0.0.2")).unwrap();
            store.insert_identity(&pseudonym("10.0.0.3")).unwrap()
        };
        assert_eq!(highest, IdentityId::new(3));

        for _ in 0..2 {
            let store = RocksStore::open(dir.path()).unwrap();
            assert_eq!(store.find_identity(&p).unwrap(), Some(IdentityId::new(1)));
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let next = store.insert_identity(&pseudonym("10.0.0.4")).unwrap();
        assert_eq!(next, IdentityId::new(4));
    }

    #[test]
    fn activity_upsert_overwrites_single_column() {
        let (store, _dir) = create_test_store();
        let id = IdentityId::new(1);

        store
            .upsert_activity(id, Category::AppOpened, noon())
            .unwrap();
        store
            .upsert_activity(id, Category::SessionStarted, noon() + Duration::minutes(1))
            .unwrap();
        store
            .upsert_activity(id, Category::SessionStarted, noon() + Duration::minutes(2))
            .unwrap();

        let record = store.get_activity(id).unwrap().unwrap();
        assert_eq!(record.app_opened_at, Some(noon()));
        assert_eq!(
            record.chat_started_at,
            Some(noon() + Duration::minutes(2))
        );
        assert_eq!(record.chat_ended_at, None);
    }

    #[test]
    fn list_active_since_filters_by_category_and_time() {
        let (store, _dir) = create_test_store();

        store
            .upsert_activity(IdentityId::new(1), Category::SessionStarted, noon())
            .unwrap();
        store
            .upsert_activity(
                IdentityId::new(2),
                Category::SessionStarted,
                noon() - Duration::minutes(30),
            )
            .unwrap();
        store
            .upsert_activity(IdentityId::new(3), Category::SessionEnded, noon())
            .unwrap();

        let since = noon() - Duration::minutes(10);
        let started = store
            .list_active_since(Category::SessionStarted, since)
            .unwrap();
        assert_eq!(started, vec![IdentityId::new(1)]);

        let ended = store.list_active_since(Category::SessionEnded, since).unwrap();
        assert_eq!(ended, vec![IdentityId::new(3)]);

        // Inclusive lower bound
        let exact = store
            .list_active_since(Category::SessionStarted, noon())
            .unwrap();
        assert_eq!(exact, vec![IdentityId::new(1)]);
    }

    #[test]
    fn list_active_since_all_matches_per_category_lists() {
        let (store, _dir) = create_test_store();

        store
            .upsert_activity(IdentityId::new(1), Category::SessionStarted, noon())
            .unwrap();
        store
            .upsert_activity(IdentityId::new(1), Category::AppOpened, noon())
            .unwrap();
        store
            .upsert_activity(IdentityId::new(2), Category::SessionEnded, noon())
            .unwrap();
        store
            .upsert_activity(
                IdentityId::new(3),
                Category::AppOpened,
                noon() - Duration::hours(1),
            )
            .unwrap();

        let since = noon() - Duration::minutes(10);
        let all = store.list_active_since_all(since).unwrap();

        for category in Category::ALL {
            assert_eq!(
                all[category.index()],
                store.list_active_since(category, since).unwrap()
            );
        }
        assert_eq!(all[Category::AppOpened.index()], vec![IdentityId::new(1)]);
        assert_eq!(all[Category::SessionEnded.index()], vec![IdentityId::new(2)]);
    }

    #[test]
    fn counter_created_on_first_increment() {
        let (store, _dir) = create_test_store();

        assert!(store.get_counters(day(4)).unwrap().is_none());

        store.increment_counter(day(4), Category::AppOpened).unwrap();

        let counters = store.get_counters(day(4)).unwrap().unwrap();
        assert_eq!(counters.times_opened, 1);
        assert_eq!(counters.chats_started, 0);
        assert_eq!(counters.chats_ended, 0);
    }

    #[test]
    fn counter_increments_target_only() {
        let (store, _dir) = create_test_store();

        for _ in 0..5 {
            store
                .increment_counter(day(4), Category::SessionStarted)
                .unwrap();
        }
        store
            .increment_counter(day(4), Category::SessionEnded)
            .unwrap();

        let counters = store.get_counters(day(4)).unwrap().unwrap();
        assert_eq!(counters.chats_started, 5);
        assert_eq!(counters.chats_ended, 1);
        assert_eq!(counters.times_opened, 0);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .increment_counter(day(4), Category::AppOpened)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let counters = store.get_counters(day(4)).unwrap().unwrap();
        assert_eq!(counters.times_opened, 400);
    }

    #[test]
    fn sum_counters_inclusive_range() {
        let (store, _dir) = create_test_store();

        store.increment_counter(day(1), Category::AppOpened).unwrap();
        store.increment_counter(day(3), Category::AppOpened).unwrap();
        store
            .increment_counter(day(3), Category::SessionStarted)
            .unwrap();
        store.increment_counter(day(5), Category::AppOpened).unwrap();
        store.increment_counter(day(9), Category::AppOpened).unwrap();

        let totals = store.sum_counters_between(day(3), day(5)).unwrap();
        assert_eq!(totals.times_opened, 2);
        assert_eq!(totals.chats_started, 1);

        let single = store.sum_counters_between(day(1), day(1)).unwrap();
        assert_eq!(single.times_opened, 1);
    }

    #[test]
    fn sum_counters_empty_and_inverted_ranges() {
        let (store, _dir) = create_test_store();
        store.increment_counter(day(1), Category::AppOpened).unwrap();

        let empty = store.sum_counters_between(day(10), day(20)).unwrap();
        assert_eq!(empty, CategoryTotals::default());

        let inverted = store.sum_counters_between(day(5), day(1)).unwrap();
        assert_eq!(inverted, CategoryTotals::default());
    }

    #[test]
    fn sum_all_counters_spans_every_day() {
        let (store, _dir) = create_test_store();

        store.increment_counter(day(1), Category::AppOpened).unwrap();
        store
            .increment_counter(day(2), Category::SessionEnded)
            .unwrap();
        store
            .increment_counter(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(), Category::AppOpened)
            .unwrap();

        let totals = store.sum_all_counters().unwrap();
        assert_eq!(totals.times_opened, 2);
        assert_eq!(totals.chats_ended, 1);
        assert_eq!(totals.chats_started, 0);
    }
}
