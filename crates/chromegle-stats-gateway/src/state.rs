//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use chromegle_stats_engine::{GeoLocator, GeolocationService, KvCache, StatisticsEngine};

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<E, L>
where
    E: StatisticsEngine,
    L: GeoLocator,
{
    /// The statistics engine.
    pub stats: Arc<E>,
    /// Cached geolocation lookups.
    pub geolocation: Arc<GeolocationService<L, dyn KvCache>>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<E, L> GatewayState<E, L>
where
    E: StatisticsEngine,
    L: GeoLocator,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        stats: Arc<E>,
        geolocation: Arc<GeolocationService<L, dyn KvCache>>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            stats,
            geolocation,
            config,
        }
    }
}

impl<E, L> Clone for GatewayState<E, L>
where
    E: StatisticsEngine,
    L: GeoLocator,
{
    fn clone(&self) -> Self {
        Self {
            stats: Arc::clone(&self.stats),
            geolocation: Arc::clone(&self.geolocation),
            config: self.config.clone(),
        }
    }
}
