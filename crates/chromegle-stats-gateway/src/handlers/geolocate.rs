//! Geolocation endpoint.

use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde_json::Value;

use chromegle_stats_engine::{GeoLocator, StatisticsEngine};

use crate::error::ApiError;
use crate::response::Envelope;
use crate::state::GatewayState;

/// Key added to the lookup payload telling whether the address has used the extension.
pub const CHROMEGLE_USER_FIELD: &str = "chromegle_user";

/// Locate an address.
///
/// Only IPv4 and IPv6 literals are looked up, in their canonical form. The
/// cached lookup payload is returned with a `chromegle_user` flag. A failing
/// store check degrades the flag to `false`.
///
/// # Errors
///
/// Returns `400` if the path is not an IP address and `502` if the lookup
/// fails or returns no object.
pub async fn geolocate<E, L>(
    State(state): State<Arc<GatewayState<E, L>>>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    E: StatisticsEngine + 'static,
    L: GeoLocator + 'static,
{
    let address = raw
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ApiError::BadRequest(format!("not an IP address: {raw:?}")))?
        .to_string();

    let mut payload = state.geolocation.locate(&address).await?;

    let known = state.stats.user_exists(&address).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to check whether address is a known user");
        false
    });
    payload.insert(CHROMEGLE_USER_FIELD.to_string(), Value::Bool(known));

    Ok(Envelope::ok(
        format!("Successfully retrieved geolocation data for {address}"),
        payload,
    ))
}
