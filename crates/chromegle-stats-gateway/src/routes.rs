//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use chromegle_stats_engine::{GeoLocator, StatisticsEngine};

use crate::handlers::{geolocate, health, stats};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `POST /chromegle/stats` - Record an event for the calling client
/// - `GET /chromegle/stats` - Statistics snapshot
/// - `GET /omegle/geolocate/:address` - Cached geolocation lookup
///
/// The router must be served with connect info (`into_make_service_with_connect_info`).
pub fn create_router<E, L>(state: GatewayState<E, L>) -> Router
where
    E: StatisticsEngine + 'static,
    L: GeoLocator + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/chromegle/stats",
            get(stats::get_stats::<E, L>).post(stats::record_stats::<E, L>),
        )
        .route(
            "/omegle/geolocate/:address",
            get(geolocate::geolocate::<E, L>),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600))
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::test_support::{body_json, build_state};
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Method, Request, StatusCode};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn app(config: GatewayConfig) -> (Router, tempfile::TempDir) {
        let (state, dir) = build_state(config);
        let peer: SocketAddr = "198.51.100.30:40000".parse().unwrap();
        (create_router(state).layer(MockConnectInfo(peer)), dir)
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/chromegle/stats")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn cors_any_origin() {
        let (router, _dir) = app(GatewayConfig {
            cors_origins: vec!["*".to_string()],
            ..Default::default()
        });

        let response = router
            .oneshot(preflight("chrome-extension://abcdef"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "3600");
    }

    #[tokio::test]
    async fn cors_specific_origins() {
        let config = GatewayConfig {
            cors_origins: vec![
                "chrome-extension://abcdef".to_string(),
                "https://chromegle.net".to_string(),
            ],
            ..Default::default()
        };

        let (router, _dir) = app(config.clone());
        let response = router
            .oneshot(preflight("https://chromegle.net"))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://chromegle.net"
        );

        let (router, _dir) = app(config);
        let response = router
            .oneshot(preflight("https://elsewhere.example"))
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn post_then_get_through_router() {
        let (router, _dir) = app(GatewayConfig::default());

        let post = Request::builder()
            .method(Method::POST)
            .uri("/chromegle/stats")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(
                r#"{{"action":"chatEnded","signature":"{}"}}"#,
                stats::expected_signature("198.51.100.30")
            )))
            .unwrap();
        let response = router.clone().oneshot(post).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let get = Request::builder()
            .uri("/chromegle/stats")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(get).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Successfully retrieved statistics");
        assert_eq!(body["payload"]["online_users"], 1);
        assert_eq!(body["payload"]["today"]["chats_ended"], 1);
    }

    #[tokio::test]
    async fn geolocate_route_extracts_address() {
        let (router, _dir) = app(GatewayConfig::default());

        let request = Request::builder()
            .uri("/omegle/geolocate/192.0.2.8")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["payload"]["ip"], "192.0.2.8");
        assert_eq!(body["payload"]["chromegle_user"], false);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = GatewayConfig {
            max_body_bytes: 16,
            ..Default::default()
        };
        let (router, _dir) = app(config);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/chromegle/stats")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"action":"{}"}}"#, "x".repeat(64))))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["status"], 413);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_in_envelope() {
        for body in [r#"{"signature":"abc"}"#, "not json"] {
            let (router, _dir) = app(GatewayConfig::default());
            let request = Request::builder()
                .method(Method::POST)
                .uri("/chromegle/stats")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap();
            let response = router.oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let envelope = body_json(response).await;
            assert_eq!(envelope["status"], 400);
            assert!(envelope["message"].as_str().unwrap().starts_with("bad request"));
            assert!(envelope["payload"].is_null());
        }
    }

    #[tokio::test]
    async fn encoded_traversal_in_address_is_rejected() {
        let (router, _dir) = app(GatewayConfig::default());

        let request = Request::builder()
            .uri("/omegle/geolocate/..%2Fadmin")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], 400);
    }
}
