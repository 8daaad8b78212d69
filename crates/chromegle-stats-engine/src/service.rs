//! Statistics service implementation.
//!
//! This module provides the `StatisticsEngine` trait and `StatisticsService`
//! implementation that ties event recording, the ledger and the cached
//! snapshot together.

use std::sync::Arc;

use async_trait::async_trait;
use chromegle_stats_core::{Category, Pseudonymizer};
use chromegle_stats_store::Store;
use chrono::{DateTime, Utc};

use crate::aggregator;
use crate::cache::{self, KvCache};
use crate::error::{Result, StatsError};
use crate::event_log;
use crate::identity;
use crate::ledger;
use crate::types::{StatisticsSnapshot, StatsConfig};

/// Trait defining the statistics operations exposed to the HTTP façade.
#[async_trait]
pub trait StatisticsEngine: Send + Sync {
    /// Record one telemetry event from a raw identity source.
    ///
    /// The action is validated before anything is written. `timestamp`
    /// defaults to now.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Validation` for an unknown action, with no rows
    /// changed. Returns `StatsError::Storage` if the store fails.
    async fn record_event(
        &self,
        identity_source: &str,
        action: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Get the statistics snapshot, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Aggregation` if the snapshot must be computed and
    /// any sub-query fails.
    async fn get_statistics(&self) -> Result<StatisticsSnapshot>;

    /// Compute the statistics snapshot without consulting the cache.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Aggregation` if any sub-query fails.
    async fn get_statistics_uncached(&self) -> Result<StatisticsSnapshot>;

    /// Check whether a raw address has ever sent an event.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if the store fails.
    async fn user_exists(&self, raw_address: &str) -> Result<bool>;
}

/// The main statistics service implementation.
pub struct StatisticsService<S: Store, C: KvCache + ?Sized> {
    store: Arc<S>,
    cache: Arc<C>,
    config: StatsConfig,
    pseudonymizer: Pseudonymizer,
}

impl<S: Store, C: KvCache + ?Sized> StatisticsService<S, C> {
    /// Create a new statistics service.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        config: StatsConfig,
        pseudonymizer: Pseudonymizer,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            pseudonymizer,
        }
    }

    /// Create with default configuration and the given pseudonymizer.
    #[must_use]
    pub fn with_defaults(store: Arc<S>, cache: Arc<C>, pseudonymizer: Pseudonymizer) -> Self {
        Self::new(store, cache, StatsConfig::default(), pseudonymizer)
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Compute a snapshot as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Aggregation` if any sub-query fails.
    pub fn assemble_snapshot_at(&self, now: DateTime<Utc>) -> Result<StatisticsSnapshot> {
        let snapshot = aggregator::assemble_snapshot(&*self.store, &self.config, now).map_err(
            |e| {
                tracing::error!(error = %e, "Failed to assemble statistics snapshot");
                StatsError::Aggregation(e)
            },
        )?;

        tracing::debug!(
            online_users = snapshot.online_users,
            forever_opened = snapshot.forever.times_opened,
            "Assembled statistics snapshot"
        );

        Ok(snapshot)
    }
}

#[async_trait]
impl<S, C> StatisticsEngine for StatisticsService<S, C>
where
    S: Store + 'static,
    C: KvCache + ?Sized + 'static,
{
    async fn record_event(
        &self,
        identity_source: &str,
        action: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let category: Category = action.parse()?;
        let at = timestamp.unwrap_or_else(Utc::now);
        let pseudonym = self.pseudonymizer.pseudonymize(identity_source);

        let identity_id = event_log::record_event(&*self.store, &pseudonym, category, at)?;
        ledger::increment(&*self.store, category, ledger::day_of(at))?;

        tracing::info!(identity_id = %identity_id, category = %category, "Recorded event");

        Ok(())
    }

    async fn get_statistics(&self) -> Result<StatisticsSnapshot> {
        cache::read_through(
            self.cache.as_ref(),
            &self.config.cache_key,
            self.config.cache_ttl(),
            move || async move { self.assemble_snapshot_at(Utc::now()) },
        )
        .await
    }

    async fn get_statistics_uncached(&self) -> Result<StatisticsSnapshot> {
        self.assemble_snapshot_at(Utc::now())
    }

    async fn user_exists(&self, raw_address: &str) -> Result<bool> {
        let pseudonym = self.pseudonymizer.pseudonymize(raw_address);
        identity::exists(&*self.store, &pseudonym)
    }
}
