//! HTTP gateway for the chromegle statistics service.
//!
//! This crate provides the public-facing API used by the browser extension.
//! It handles:
//!
//! - Event ingestion, identifying the client by its network address
//! - The cached statistics snapshot
//! - Cached geolocation lookups enriched with a known-user flag
//! - CORS, body limits and request timeouts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Browser extension (HTTP)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  chromegle-stats-gateway                    │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Client    │ │   Router    │ │    Response         │    │
//! │  │   Address   │ │  + Handlers │ │    Envelope         │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    ┌─────────┴─────────┐
//!                    ▼                   ▼
//!             ┌────────────┐      ┌────────────┐
//!             │ Statistics │      │ Geolocation│
//!             │  Engine    │      │  Service   │
//!             └────────────┘      └────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use chromegle_stats_gateway::{GatewayConfig, GatewayState, create_router};
//! use chromegle_stats_engine::{
//!     GeojsClient, GeolocationConfig, GeolocationService, KvCache, MemoryCache, Pseudonymizer,
//!     StatisticsService,
//! };
//! use chromegle_stats_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/chromegle-stats")?);
//! let cache = Arc::new(MemoryCache::new());
//! let stats = Arc::new(StatisticsService::with_defaults(
//!     store,
//!     Arc::clone(&cache),
//!     Pseudonymizer::new("secret"),
//! ));
//!
//! let geo_config = GeolocationConfig::default();
//! let locator = Arc::new(GeojsClient::new(geo_config.base_url.clone()));
//! let geo_cache: Arc<dyn KvCache> = cache;
//! let geolocation = Arc::new(GeolocationService::new(locator, geo_cache, geo_config));
//!
//! let state = GatewayState::new(stats, geolocation, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use response::Envelope;
pub use routes::create_router;
pub use state::GatewayState;
