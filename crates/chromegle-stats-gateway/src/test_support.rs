//! Shared fixtures for handler tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;

use chromegle_stats_engine::{
    GeoLocator, GeoPayload, GeolocationConfig, GeolocationService, KvCache, MemoryCache,
    Pseudonymizer, StatisticsService, StatsError,
};
use chromegle_stats_store::RocksStore;

use crate::config::GatewayConfig;
use crate::state::GatewayState;

/// Lookups for this address fail.
pub const UNREACHABLE_ADDRESS: &str = "192.0.2.255";

/// Answers every lookup locally.
pub struct StaticLocator;

#[async_trait]
impl GeoLocator for StaticLocator {
    async fn locate(&self, address: &str) -> chromegle_stats_engine::Result<GeoPayload> {
        if address == UNREACHABLE_ADDRESS {
            return Err(StatsError::Geolocation {
                address: address.to_string(),
                reason: "unreachable".to_string(),
            });
        }

        let mut payload = GeoPayload::new();
        payload.insert("ip".to_string(), Value::String(address.to_string()));
        payload.insert("country_code".to_string(), Value::String("NL".to_string()));
        Ok(payload)
    }
}

pub type TestState = GatewayState<StatisticsService<RocksStore, MemoryCache>, StaticLocator>;

pub fn build_state(config: GatewayConfig) -> (TestState, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let stats = Arc::new(StatisticsService::with_defaults(
        store,
        Arc::new(MemoryCache::new()),
        Pseudonymizer::new("gateway-tests"),
    ));

    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let geolocation = Arc::new(GeolocationService::new(
        Arc::new(StaticLocator),
        cache,
        GeolocationConfig::default(),
    ));

    (GatewayState::new(stats, geolocation, config), dir)
}

pub fn setup(config: GatewayConfig) -> (Arc<TestState>, TempDir) {
    let (state, dir) = build_state(config);
    (Arc::new(state), dir)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
