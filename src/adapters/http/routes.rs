//! Top-level HTTP router.
//!
//! ```text
//! GET /health      service and connection status
//! GET /ws          observer WebSocket
//! GET /*           static UI files
//! ```
//!
//! Every route sits behind the per-IP rate limiter and request tracing.

use std::path::Path;

use axum::{http::HeaderValue, middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::application::SessionHandle;

use super::handlers::{health, HealthState};
use super::middleware::{rate_limit_middleware, RateLimiterState};

/// Builds the application router.
pub fn app_router(
    session: SessionHandle,
    rate_limit: RateLimiterState,
    static_dir: impl AsRef<Path>,
    cors_origins: &[String],
) -> Router {
    let health_routes = Router::new().route("/health", get(health)).with_state(HealthState {
        session: session.clone(),
    });

    Router::new()
        .merge(health_routes)
        .merge(websocket_router().with_state(WebSocketState::new(session)))
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Allows the listed origins, or any origin when the list is empty.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any)
    } else {
        CorsLayer::new().allow_origin(origins).allow_methods(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rate_limiter::InMemoryRateLimiter;
    use crate::adapters::session::MockSessionConnector;
    use crate::application::{BroadcastHub, DemoSettings, SessionManager, SessionSettings};
    use crate::ports::{AuthStore, PassthroughRenderer};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router(limit: u32) -> Router {
        let session = SessionManager::spawn(
            SessionSettings {
                sender_name: "Relay Bot".into(),
                auth: AuthStore::new("auth"),
                reconnect_delay: Duration::from_secs(5),
                demo: Some(DemoSettings::default()),
            },
            Arc::new(MockSessionConnector::new()),
            Arc::new(PassthroughRenderer),
            Arc::new(BroadcastHub::with_default_capacity(true)),
        );
        let limiter = Arc::new(InMemoryRateLimiter::new(limit, Duration::from_secs(900)));
        app_router(
            session,
            RateLimiterState::new(limiter),
            "does-not-exist",
            &[],
        )
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_connection_state() {
        let response = router(10).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connected"], false);
        assert_eq!(json["state"], "disconnected");
        assert_eq!(json["demoMode"], true);
    }

    #[tokio::test]
    async fn missing_static_file_is_404() {
        let response = router(10).oneshot(get("/nope.html")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rate_limit_applies_to_every_route() {
        let app = router(1);
        let first = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.oneshot(get("/nope.html")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn invalid_cors_origins_are_skipped() {
        let _layer = cors_layer(&["http://localhost:3000".into(), "bad\norigin".into()]);
    }
}
