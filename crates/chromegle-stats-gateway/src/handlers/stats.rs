//! Telemetry endpoints.
//!
//! `POST /chromegle/stats` records one event for the calling client and
//! `GET /chromegle/stats` serves the cached statistics snapshot.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use chromegle_stats_engine::{GeoLocator, StatisticsEngine};

use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::response::Envelope;
use crate::state::GatewayState;

/// Header set by the fronting proxy with the original client address.
pub const FORWARDED_IP_HEADER: &str = "cf-connecting-ip";

/// Request to record a telemetry event.
#[derive(Debug, Deserialize)]
pub struct StatsBody {
    /// Event category wire name (`chatStarted`, `chatEnded`, `omegleOpened`).
    pub action: String,
    /// Hex SHA-1 of the client address as the extension sees it.
    #[serde(default)]
    pub signature: Option<String>,
}

/// The signature a client must send: lowercase hex SHA-1 of its address.
#[must_use]
pub fn expected_signature(address: &str) -> String {
    hex::encode(Sha1::digest(address.as_bytes()))
}

/// Resolve the address that identifies the calling client.
#[must_use]
pub fn client_address(config: &GatewayConfig, peer: SocketAddr, headers: &HeaderMap) -> String {
    if config.trust_forwarded_header {
        let forwarded = headers
            .get(FORWARDED_IP_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(address) = forwarded {
            return address.to_string();
        }
    }

    peer.ip().to_string()
}

/// Record an event for the calling client.
///
/// # Errors
///
/// Returns `400` for a malformed body, a missing or mismatched signature, or
/// an unknown action, and `500` if the event cannot be stored.
pub async fn record_stats<E, L>(
    State(state): State<Arc<GatewayState<E, L>>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<StatsBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    E: StatisticsEngine + 'static,
    L: GeoLocator + 'static,
{
    let Json(body) = payload?;
    let address = client_address(&state.config, peer, &headers);

    if body.signature.as_deref() != Some(expected_signature(&address).as_str()) {
        tracing::debug!("Rejected unsigned statistics request");
        return Err(ApiError::Unauthorized);
    }

    state.stats.record_event(&address, &body.action, None).await?;

    Ok(Envelope::empty(StatusCode::OK, "Received Statistics"))
}

/// Get the statistics snapshot.
///
/// # Errors
///
/// Returns `500` if the snapshot cannot be computed.
pub async fn get_stats<E, L>(
    State(state): State<Arc<GatewayState<E, L>>>,
) -> Result<impl IntoResponse, ApiError>
where
    E: StatisticsEngine + 'static,
    L: GeoLocator + 'static,
{
    let snapshot = state.stats.get_statistics().await?;

    Ok(Envelope::ok("Successfully retrieved statistics", snapshot))
}
