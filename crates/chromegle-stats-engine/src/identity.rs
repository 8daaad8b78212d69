//! Identity resolution.
//!
//! Maps a pseudonym to its durable surrogate id, registering it on first sight.
//! Registration is insert-then-select: when a concurrent writer registers the
//! same pseudonym first, the losing insert reports a conflict and the lookup is
//! simply repeated.

use chromegle_stats_core::{IdentityId, Pseudonym};
use chromegle_stats_store::{Store, StoreError};

use crate::error::{Result, StatsError};

/// Insert attempts before giving up on a contended registration.
const MAX_REGISTRATION_ATTEMPTS: usize = 4;

/// Resolve the identity id for a pseudonym, creating it if absent.
///
/// # Errors
///
/// Returns `StatsError::Storage` if the store fails. An id is never fabricated.
pub fn resolve_or_create<S: Store>(store: &S, pseudonym: &Pseudonym) -> Result<IdentityId> {
    for attempt in 1..=MAX_REGISTRATION_ATTEMPTS {
        if let Some(id) = store.find_identity(pseudonym)? {
            return Ok(id);
        }

        match store.insert_identity(pseudonym) {
            Ok(_) => {}
            Err(StoreError::Conflict(reason)) => {
                tracing::debug!(attempt, reason = %reason, "Identity registration raced, re-reading");
            }
            Err(e) => return Err(e.into()),
        }

        // Re-read whichever insert won
        if let Some(id) = store.find_identity(pseudonym)? {
            tracing::debug!(identity_id = %id, "Registered identity");
            return Ok(id);
        }
    }

    Err(StatsError::Storage(StoreError::Conflict(format!(
        "identity registration did not settle after {MAX_REGISTRATION_ATTEMPTS} attempts"
    ))))
}

/// Check whether a pseudonym has ever been registered.
///
/// # Errors
///
/// Returns `StatsError::Storage` if the store fails.
pub fn exists<S: Store>(store: &S, pseudonym: &Pseudonym) -> Result<bool> {
    Ok(store.find_identity(pseudonym)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromegle_stats_core::Pseudonymizer;
    use chromegle_stats_store::RocksStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (Arc<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (store, dir)
    }

    #[test]
    fn resolve_is_idempotent() {
        let (store, _dir) = setup();
        let pseudonym = Pseudonymizer::new("test").pseudonymize("10.1.1.1");

        let first = resolve_or_create(store.as_ref(), &pseudonym).unwrap();
        let second = resolve_or_create(store.as_ref(), &pseudonym).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count_identities().unwrap(), 1);
    }

    #[test]
    fn concurrent_first_resolution_yields_one_identity() {
        let (store, _dir) = setup();
        let pseudonym = Pseudonymizer::new("test").pseudonymize("10.1.1.1");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || resolve_or_create(store.as_ref(), &pseudonym).unwrap())
            })
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.count_identities().unwrap(), 1);
    }

    #[test]
    fn concurrent_distinct_resolutions_all_register() {
        let (store, _dir) = setup();
        let pseudonymizer = Pseudonymizer::new("test");

        let handles: Vec<_> = (0..48)
            .map(|i| {
                let store = Arc::clone(&store);
                let pseudonym = pseudonymizer.pseudonymize(&format!("10.2.0.{i}"));
                std::thread::spawn(move || resolve_or_create(store.as_ref(), &pseudonym).unwrap())
            })
            .collect();
        let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable_by_key(|id| id.get());
        ids.dedup();

        assert_eq!(ids.len(), 48);
        assert_eq!(store.count_identities().unwrap(), 48);
    }

    #[test]
    fn exists_only_after_registration() {
        let (store, _dir) = setup();
        let pseudonym = Pseudonymizer::new("test").pseudonymize("10.1.1.1");

        assert!(!exists(store.as_ref(), &pseudonym).unwrap());
        resolve_or_create(store.as_ref(), &pseudonym).unwrap();
        assert!(exists(store.as_ref(), &pseudonym).unwrap());
    }
}
