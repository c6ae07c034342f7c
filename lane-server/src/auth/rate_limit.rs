//! Application-layer rate limiting
//!
//! Fixed-window counters keyed by (route, client). The client is the
//! authenticated user when the auth guard ran first, else the best IP hint.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::auth::UserIdentity;
use crate::state::AppState;

/// Limit and window of one throttled endpoint class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPreset {
    pub limit: u32,
    pub window_secs: u64,
}

impl RateLimitPreset {
    /// Sensitive operations such as checkout
    pub const STRICT: Self = Self::new(5, 60);
    pub const MODERATE: Self = Self::new(20, 60);
    /// Read-heavy endpoints
    pub const GENEROUS: Self = Self::new(100, 60);
    /// Not applied to gateway callbacks, which must never be throttled
    pub const WEBHOOK: Self = Self::new(10, 60);
    pub const PAYMENT: Self = Self::new(10, 300);
    pub const NOTIFICATIONS: Self = Self::new(30, 3600);

    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }
}

/// Outcome of one counted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window resets
    pub reset_after_secs: u64,
}

struct ClientEntry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    /// route -> (client key -> entry)
    inner: Arc<Mutex<HashMap<String, HashMap<String, ClientEntry>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request and decide whether it may proceed.
    pub async fn check(&self, route: &str, client: &str, preset: RateLimitPreset) -> RateLimitDecision {
        let mut map = self.inner.lock().await;
        let route_map = map.entry(route.to_owned()).or_default();
        let now = Instant::now();
        let window = Duration::from_secs(preset.window_secs);

        let entry = route_map.entry(client.to_owned()).or_insert_with(|| ClientEntry {
            count: 0,
            window_start: now,
            window,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= entry.window {
            entry.count = 0;
            entry.window_start = now;
            entry.window = window;
        }

        let allowed = entry.count < preset.limit;
        if allowed {
            entry.count += 1;
        }

        let elapsed = now.duration_since(entry.window_start);
        let reset_after = entry.window.saturating_sub(elapsed);

        RateLimitDecision {
            allowed,
            limit: preset.limit,
            remaining: preset.limit.saturating_sub(entry.count),
            reset_after_secs: reset_after.as_secs_f64().ceil() as u64,
        }
    }

    /// Drop entries whose window has ended
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        for route_map in map.values_mut() {
            route_map.retain(|_, entry| now.duration_since(entry.window_start) < entry.window);
        }

        map.retain(|_, route_map| !route_map.is_empty());
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.inner.lock().await.values().map(HashMap::len).sum()
    }
}

/// Client key: user id if authenticated, else forwarded IP headers, then peer address.
fn client_key(request: &Request) -> String {
    if let Some(identity) = request.extensions().get::<UserIdentity>() {
        return format!("user:{}", identity.user_id);
    }

    let headers = request.headers();
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let ip = forwarded
        .or_else(|| header_str(headers, "x-real-ip"))
        .or_else(|| header_str(headers, "cf-connecting-ip"))
        .map(str::to_owned)
        .or_else(|| {
            request
                .extensions()
                .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_owned());

    format!("ip:{ip}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let reset_at = chrono::Utc::now().timestamp() as u64 + decision.reset_after_secs;
    for (name, value) in [
        ("x-ratelimit-limit", decision.limit as u64),
        ("x-ratelimit-remaining", decision.remaining as u64),
        ("x-ratelimit-reset", reset_at),
    ] {
        headers.insert(name, HeaderValue::from(value));
    }
}

async fn enforce(state: AppState, preset: RateLimitPreset, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let client = client_key(&request);

    let decision = state.rate_limiter.check(&route, &client, preset).await;
    if !decision.allowed {
        tracing::warn!(route = %route, client = %client, "Rate limit exceeded");
        let mut response = AppError::rate_limited(decision.reset_after_secs).into_response();
        apply_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &decision);
    response
}

/// 5 requests/minute (checkout)
pub async fn strict_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(state, RateLimitPreset::STRICT, request, next).await
}

/// 20 requests/minute (admin writes, profile updates)
pub async fn moderate_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RateLimitPreset::MODERATE, request, next).await
}

/// 100 requests/minute (public reads)
pub async fn generous_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RateLimitPreset::GENEROUS, request, next).await
}

/// 10 requests/5 minutes (payment session creation)
pub async fn payment_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RateLimitPreset::PAYMENT, request, next).await
}

/// 30 requests/hour (notification preferences)
pub async fn notifications_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RateLimitPreset::NOTIFICATIONS, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(3, 60);

        for expected_remaining in [2, 1, 0] {
            let d = limiter.check("/api/orders", "ip:1.2.3.4", preset).await;
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }

        let d = limiter.check("/api/orders", "ip:1.2.3.4", preset).await;
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert!(d.reset_after_secs <= 60);
    }

    #[tokio::test]
    async fn routes_and_clients_are_counted_separately() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(1, 60);

        assert!(limiter.check("/a", "ip:1", preset).await.allowed);
        assert!(!limiter.check("/a", "ip:1", preset).await.allowed);
        assert!(limiter.check("/b", "ip:1", preset).await.allowed);
        assert!(limiter.check("/a", "ip:2", preset).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(1, 60);

        assert!(limiter.check("/a", "ip:1", preset).await.allowed);
        assert!(!limiter.check("/a", "ip:1", preset).await.allowed);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("/a", "ip:1", preset).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_purges_expired_windows() {
        let limiter = RateLimiter::new();
        limiter.check("/a", "ip:1", RateLimitPreset::new(5, 60)).await;
        limiter.check("/b", "ip:2", RateLimitPreset::new(5, 3600)).await;

        tokio::time::advance(Duration::from_secs(120)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[test]
    fn presets_match_published_limits() {
        assert_eq!(RateLimitPreset::STRICT, RateLimitPreset::new(5, 60));
        assert_eq!(RateLimitPreset::MODERATE, RateLimitPreset::new(20, 60));
        assert_eq!(RateLimitPreset::GENEROUS, RateLimitPreset::new(100, 60));
        assert_eq!(RateLimitPreset::WEBHOOK, RateLimitPreset::new(10, 60));
        assert_eq!(RateLimitPreset::PAYMENT, RateLimitPreset::new(10, 300));
        assert_eq!(RateLimitPreset::NOTIFICATIONS, RateLimitPreset::new(30, 3600));
    }

    #[test]
    fn client_key_prefers_user_then_forwarded_ip() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&req), "ip:203.0.113.7");

        let user_id = uuid::Uuid::new_v4();
        req.extensions_mut().insert(UserIdentity {
            user_id,
            email: None,
        });
        assert_eq!(client_key(&req), format!("user:{user_id}"));
    }

    #[test]
    fn client_key_falls_back_through_headers() {
        let req = Request::builder()
            .header("cf-connecting-ip", "192.0.2.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&req), "ip:192.0.2.9");

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&req), "ip:unknown");
    }
}
