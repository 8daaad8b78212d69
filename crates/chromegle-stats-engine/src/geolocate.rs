//! Geolocation lookups behind a read-through cache.
//!
//! The lookup itself is delegated to an external API; this module only caches
//! its answers per address.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::cache::{self, KvCache};
use crate::error::{Result, StatsError};
use crate::types::GeolocationConfig;

/// A geolocation payload as returned by the lookup API.
pub type GeoPayload = Map<String, Value>;

/// Trait for geolocation lookups.
///
/// This trait abstracts the geolocation API, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Look up an address.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Geolocation` if the request fails or the response is
    /// not a JSON object.
    async fn locate(&self, address: &str) -> Result<GeoPayload>;
}

/// HTTP client for the geojs.io lookup API.
#[derive(Debug, Clone)]
pub struct GeojsClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeojsClient {
    /// Create a new geolocation client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self::with_client(client, base_url)
    }

    /// Create a new geolocation client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeoLocator for GeojsClient {
    async fn locate(&self, address: &str) -> Result<GeoPayload> {
        let url = format!("{}/v1/ip/geo/{address}.json", self.base_url);
        let failed = |reason: String| StatsError::Geolocation {
            address: address.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("lookup returned status {status}")));
        }

        match response.json::<Value>().await {
            Ok(Value::Object(payload)) if !payload.is_empty() => Ok(payload),
            Ok(_) => Err(failed("lookup returned no object".to_string())),
            Err(e) => Err(failed(format!("invalid response body: {e}"))),
        }
    }
}

/// Geolocation with per-address caching.
pub struct GeolocationService<G: GeoLocator, C: KvCache + ?Sized> {
    locator: Arc<G>,
    cache: Arc<C>,
    config: GeolocationConfig,
}

impl<G: GeoLocator, C: KvCache + ?Sized> GeolocationService<G, C> {
    /// Create a new geolocation service.
    #[must_use]
    pub fn new(locator: Arc<G>, cache: Arc<C>, config: GeolocationConfig) -> Self {
        Self {
            locator,
            cache,
            config,
        }
    }

    /// Locate an address, serving a cached answer when one is live.
    ///
    /// Blank addresses are looked up but never cached.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Geolocation` if the lookup fails.
    pub async fn locate(&self, address: &str) -> Result<GeoPayload> {
        let address = address.trim();
        if address.is_empty() {
            return self.locator.locate(address).await;
        }

        let key = self.config.cache_key(address);
        cache::read_through(self.cache.as_ref(), &key, self.config.cache_ttl(), move || {
            self.locator.locate(address)
        })
        .await
    }
}
