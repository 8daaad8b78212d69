//! Statistics engine for chromegle-stats.
//!
//! This crate provides the business logic behind the telemetry endpoint:
//! pseudonymous identity resolution, the per-identity activity log, the daily
//! counter ledger, windowed aggregation, and the read-through caches that sit
//! in front of the snapshot and geolocation lookups.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gateway (HTTP)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StatisticsService                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Identity + │ │   Daily     │ │  Windowed           │    │
//! │  │  Event Log  │ │   Ledger    │ │  Aggregator         │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Store   │   │  Cache   │   │  GeoJS   │
//!        │ (RocksDB)│   │  (TTL)   │   │  (HTTP)  │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use chromegle_stats_engine::{MemoryCache, Pseudonymizer, StatisticsEngine, StatisticsService};
//! use chromegle_stats_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/chromegle-stats")?);
//! let cache = Arc::new(MemoryCache::new());
//! let stats = StatisticsService::with_defaults(store, cache, Pseudonymizer::new("secret"));
//!
//! stats.record_event("203.0.113.9", "omegleOpened", None).await?;
//! let snapshot = stats.get_statistics().await?;
//!
//! println!("{} users online", snapshot.online_users);
//! # Ok(())
//! # }
//! ```
//!
//! # Windows
//!
//! - `ten_minutes`: distinct identities per category in the trailing window
//! - `today`: ledger row of the current server-local day
//! - `week`: ledger rows from seven days ago through today, inclusive
//! - `forever`: every ledger row

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod event_log;
pub mod geolocate;
pub mod identity;
pub mod ledger;
pub mod service;
pub mod types;

pub use cache::{CacheError, KvCache, MemoryCache};
pub use error::{Result, StatsError};
pub use geolocate::{GeoLocator, GeoPayload, GeojsClient, GeolocationService};
pub use service::{StatisticsEngine, StatisticsService};
pub use types::{GeolocationConfig, StatisticsSnapshot, StatsConfig};

// Re-export commonly used types from dependencies for convenience
pub use chromegle_stats_core::{Category, CategoryTotals, IdentityId, Pseudonym, Pseudonymizer};
