//! Per-IP rate limiting middleware for axum.
//!
//! Clients are keyed on the socket address. Forwarded-for headers are only
//! read when the state is built with `trust_proxy`, since any client can
//! set them.
//!
//! Rate limit status is returned in standard HTTP headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: Seconds to wait (only on 429 response)
//!
//! # Example
//!
//! ```ignore
//! let state = RateLimiterState::new(Arc::new(InMemoryRateLimiter::with_defaults()));
//!
//! let app = Router::new()
//!     .route("/health", get(health))
//!     .layer(middleware::from_fn_with_state(state, rate_limit_middleware));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::ErrorCode;
use crate::ports::{RateLimitDenied, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter};

/// Rate limiter middleware state.
#[derive(Clone)]
pub struct RateLimiterState {
    pub limiter: Arc<dyn RateLimiter>,
    /// Take the client address from proxy headers.
    pub trust_proxy: bool,
}

impl RateLimiterState {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            limiter,
            trust_proxy: false,
        }
    }

    pub fn trusting_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }
}

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    pub static X_RATELIMIT_REMAINING: HeaderName =
        HeaderName::from_static("x-ratelimit-remaining");
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// Counts the request against the client's IP and rejects it with 429 once
/// the window is used up. Fails open when the limiter errors.
pub async fn rate_limit_middleware(
    State(state): State<RateLimiterState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let key = extract_client_ip(request.headers(), connect_info.as_ref(), state.trust_proxy)
        .map(|ip| RateLimitKey::ip(&ip))
        .unwrap_or_else(RateLimitKey::unknown);

    let status = match state.limiter.check(key).await {
        Ok(RateLimitResult::Allowed(status)) => Some(status),
        Ok(RateLimitResult::Denied(denied)) => return rate_limit_response(&denied),
        Err(e) => {
            tracing::warn!(error = %e, "Rate limiter unavailable");
            None
        }
    };

    let mut response = next.run(request).await;
    if let Some(status) = status {
        add_rate_limit_headers(response.headers_mut(), &status);
    }
    response
}

/// Client IP. Proxy headers win over the socket address only when trusted.
fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> Option<String> {
    let socket_ip = connect_info.map(|ci| ci.0.ip().to_string());
    if !trust_proxy {
        return socket_ip;
    }

    if let Some(forwarded) = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded.split(',').next() {
            let first_ip = first_ip.trim();
            if !first_ip.is_empty() {
                return Some(first_ip.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return Some(real_ip.trim().to_string());
    }

    socket_ip
}

fn rate_limit_response(denied: &RateLimitDenied) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": denied.message,
            "code": ErrorCode::RateLimited.to_string(),
            "retry_after_secs": denied.retry_after_secs
        })),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(denied.limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));
    headers.insert(header::RETRY_AFTER, HeaderValue::from(denied.retry_after_secs));
    response
}

fn add_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(status.limit));
    headers.insert(
        headers::X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(status.remaining),
    );
    headers.insert(
        headers::X_RATELIMIT_RESET.clone(),
        HeaderValue::from(status.reset_at.timestamp()),
    );
}
