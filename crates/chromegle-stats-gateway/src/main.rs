//! Chromegle Stats Gateway - HTTP API
//!
//! This is the main entry point for the statistics service. The gateway
//! embeds the statistics engine and serves it over HTTP.
//!
//! # Environment
//!
//! - `LISTEN_ADDR`: bind address (default `0.0.0.0:8080`)
//! - `DATA_DIR`: `RocksDB` directory (default `/data/chromegle-stats`)
//! - `PSEUDONYM_SECRET`: key mixed into every pseudonym
//! - `GEOLOCATE_URL`: geolocation API base URL (default `https://get.geojs.io`)
//! - `TRUST_FORWARDED_HEADER`: set to `true` behind a proxy that sets `cf-connecting-ip`
//! - `CORS_ORIGINS`: comma-separated allowed origins (default `*`)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chromegle_stats_engine::{
    GeojsClient, GeolocationConfig, GeolocationService, KvCache, MemoryCache, Pseudonymizer,
    StatisticsService, StatsConfig,
};
use chromegle_stats_gateway::{create_router, GatewayConfig, GatewayState};
use chromegle_stats_store::RocksStore;

/// How often expired cache entries are dropped.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chromegle_stats=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Chromegle Stats Gateway");

    // Load configuration from environment
    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/chromegle-stats".into());
    let pseudonym_secret = std::env::var("PSEUDONYM_SECRET").ok();
    let trust_forwarded_header = std::env::var("TRUST_FORWARDED_HEADER")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    let mut geolocation_config = GeolocationConfig::default();
    if let Ok(url) = std::env::var("GEOLOCATE_URL") {
        geolocation_config.base_url = url;
    }

    let mut gateway_config = GatewayConfig {
        listen_addr,
        trust_forwarded_header,
        ..Default::default()
    };
    if let Ok(origins) = std::env::var("CORS_ORIGINS") {
        gateway_config.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    tracing::info!(
        listen_addr = %gateway_config.listen_addr,
        data_dir = %data_dir,
        geolocate_url = %geolocation_config.base_url,
        trust_forwarded_header,
        cors_origins = ?gateway_config.cors_origins,
        "Gateway configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&data_dir)?);

    let pseudonymizer = pseudonym_secret.map_or_else(
        || {
            tracing::warn!("No PSEUDONYM_SECRET set - pseudonyms are only hashed, not keyed");
            Pseudonymizer::default()
        },
        |secret| Pseudonymizer::new(&secret),
    );

    // Shared in-process cache for snapshots and lookups
    let cache = Arc::new(MemoryCache::new());
    spawn_cache_purger(Arc::clone(&cache));

    let stats = Arc::new(StatisticsService::new(
        store,
        Arc::clone(&cache),
        StatsConfig::default(),
        pseudonymizer,
    ));
    tracing::info!(
        cache_ttl_seconds = stats.config().cache_ttl_seconds,
        "Statistics service initialized"
    );

    let locator = Arc::new(GeojsClient::new(geolocation_config.base_url.clone()));
    let geolocation_cache: Arc<dyn KvCache> = cache;
    let geolocation = Arc::new(GeolocationService::new(
        locator,
        geolocation_cache,
        geolocation_config,
    ));

    let listen_addr = gateway_config.listen_addr.clone();
    let state = GatewayState::new(stats, geolocation, gateway_config);

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically drop expired entries so idle keys do not accumulate.
fn spawn_cache_purger(cache: Arc<MemoryCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            cache.purge_expired();
            tracing::trace!(entries = cache.len(), "Purged expired cache entries");
        }
    });
}
