//! Windowed aggregation over the activity log and the daily ledger.
//!
//! Recent activity is computed at identity level so that an identity active in
//! several categories is counted once in `online_users`. Day buckets only ever
//! see category-level sums from the ledger.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use chromegle_stats_core::{Category, CategoryTotals, IdentityId};
use chromegle_stats_store::{Store, StoreError};

use crate::ledger;
use crate::types::{StatisticsSnapshot, StatsConfig};

/// Distinct identities whose `category` timestamp lies in the trailing window.
///
/// The lower bound `now - minutes` is inclusive.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn recent_activity<S: Store>(
    store: &S,
    category: Category,
    minutes: u32,
    now: DateTime<Utc>,
) -> Result<HashSet<IdentityId>, StoreError> {
    let since = now - Duration::minutes(i64::from(minutes));
    Ok(store
        .list_active_since(category, since)?
        .into_iter()
        .collect())
}

/// Sum ledger rows for `categories` over an inclusive day range.
///
/// An empty range yields zero for every category.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn bucketed_sum<S: Store>(
    store: &S,
    categories: &[Category],
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> Result<CategoryTotals, StoreError> {
    Ok(store
        .sum_counters_between(start, end)?
        .restricted_to(categories))
}

/// Sum every ledger row ever written for `categories`.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn all_time_sum<S: Store>(
    store: &S,
    categories: &[Category],
) -> Result<CategoryTotals, StoreError> {
    Ok(store.sum_all_counters()?.restricted_to(categories))
}

/// Compute a complete statistics snapshot as of `now`.
///
/// Either every figure is computed or the whole snapshot fails.
///
/// # Errors
///
/// Returns the first store error encountered; callers surface it as an
/// aggregation failure.
pub fn assemble_snapshot<S: Store>(
    store: &S,
    config: &StatsConfig,
    now: DateTime<Utc>,
) -> Result<StatisticsSnapshot, StoreError> {
    let since = now - Duration::minutes(i64::from(config.recent_window_minutes));
    let active = store.list_active_since_all(since)?;

    let mut online: HashSet<IdentityId> = HashSet::new();
    let mut ten_minutes = CategoryTotals::default();

    for category in Category::ALL {
        let ids = &active[category.index()];
        *ten_minutes.get_mut(category) = ids.len() as u64;
        online.extend(ids.iter().copied());
    }

    let today = ledger::day_of(now);
    let week_start = today - Duration::days(i64::from(config.week_days));

    Ok(StatisticsSnapshot {
        online_users: online.len() as u64,
        ten_minutes,
        today: bucketed_sum(store, &Category::ALL, today, today)?,
        week: bucketed_sum(store, &Category::ALL, week_start, today)?,
        forever: all_time_sum(store, &Category::ALL)?,
    })
}
