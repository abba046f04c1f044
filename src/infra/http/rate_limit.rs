//! Fixed-window request limiter keyed by client IP, endpoint class and access kind.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, Request};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::config::RateLimitSettings;
use crate::util::lock::mutex_lock;

use super::error::ApiError;
use super::state::AppState;

const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Admin,
    Public,
}

impl EndpointClass {
    fn as_str(self) -> &'static str {
        match self {
            EndpointClass::Admin => "admin",
            EndpointClass::Public => "public",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    pub fn from_method(method: &Method) -> Self {
        if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
            AccessKind::Read
        } else {
            AccessKind::Write
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
        }
    }
}

/// Outcome of a limiter check or peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl RateDecision {
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    admin_write: u32,
    admin_read: u32,
    public_read: u32,
    buckets: DashMap<String, Window>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            window: settings.window,
            admin_write: settings.admin_write.get(),
            admin_read: settings.admin_read.get(),
            public_read: settings.public_read.get(),
            buckets: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn limit_for(&self, class: EndpointClass, kind: AccessKind) -> u32 {
        match (class, kind) {
            (EndpointClass::Admin, AccessKind::Write) => self.admin_write,
            (EndpointClass::Admin, AccessKind::Read) => self.admin_read,
            (EndpointClass::Public, _) => self.public_read,
        }
    }

    /// Count one request and report whether it fits in the current window.
    pub fn check(&self, client: &str, class: EndpointClass, kind: AccessKind) -> RateDecision {
        let now = Instant::now();
        self.maybe_sweep(now);

        let limit = self.limit_for(class, kind);
        let mut entry = self
            .buckets
            .entry(bucket_key(client, class, kind))
            .or_insert(Window {
                started: now,
                count: 0,
            });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let reset_after = self.window.saturating_sub(now.duration_since(entry.started));
        if entry.count >= limit {
            return RateDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_after,
            };
        }
        entry.count += 1;
        RateDecision {
            allowed: true,
            limit,
            remaining: limit - entry.count,
            reset_after,
        }
    }

    /// Report the current window without counting a request.
    pub fn info(&self, client: &str, class: EndpointClass, kind: AccessKind) -> RateDecision {
        let now = Instant::now();
        let limit = self.limit_for(class, kind);
        let current = self
            .buckets
            .get(&bucket_key(client, class, kind))
            .map(|entry| *entry)
            .filter(|window| now.duration_since(window.started) < self.window);

        match current {
            Some(window) => RateDecision {
                allowed: window.count < limit,
                limit,
                remaining: limit.saturating_sub(window.count),
                reset_after: self
                    .window
                    .saturating_sub(now.duration_since(window.started)),
            },
            None => RateDecision {
                allowed: true,
                limit,
                remaining: limit,
                reset_after: self.window,
            },
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Drop expired windows, at most once per window length.
    fn maybe_sweep(&self, now: Instant) {
        {
            let mut last = mutex_lock(&self.last_sweep, "quire::http::rate_limit", "sweep");
            if now.duration_since(*last) < self.window {
                return;
            }
            *last = now;
        }
        let window = self.window;
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.started) < window);
    }
}

fn bucket_key(client: &str, class: EndpointClass, kind: AccessKind) -> String {
    format!("{client}:{}:{}", class.as_str(), kind.as_str())
}

/// Client address as seen through the CDN, then proxies, then the socket.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let from_header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    from_header("cf-connecting-ip")
        .or_else(|| from_header("x-forwarded-for"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

async fn enforce(
    state: &AppState,
    class: EndpointClass,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(request.headers(), peer);
    let kind = AccessKind::from_method(request.method());

    let decision = state.rate_limiter.check(&client, class, kind);
    if !decision.allowed {
        metrics::counter!(
            "quire_rate_limit_denied_total",
            "class" => class.as_str(),
            "kind" => kind.as_str()
        )
        .increment(1);
        debug!(
            target = "quire::http::rate_limit",
            client = %client,
            class = class.as_str(),
            kind = kind.as_str(),
            "request rate limited"
        );
        return ApiError::rate_limited(decision.retry_after_secs());
    }

    next.run(request).await
}

pub async fn limit_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, EndpointClass::Admin, request, next).await
}

pub async fn limit_public(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, EndpointClass::Public, request, next).await
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use axum::http::HeaderValue;

    use super::*;

    fn limiter(write: u32, read: u32, public: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitSettings {
            window: Duration::from_secs(60),
            admin_write: NonZeroU32::new(write).expect("non-zero"),
            admin_read: NonZeroU32::new(read).expect("non-zero"),
            public_read: NonZeroU32::new(public).expect("non-zero"),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn denies_after_limit_and_resets_with_window() {
        let limiter = limiter(2, 10, 10);

        assert!(limiter.check("1.2.3.4", EndpointClass::Admin, AccessKind::Write).allowed);
        let second = limiter.check("1.2.3.4", EndpointClass::Admin, AccessKind::Write);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let denied = limiter.check("1.2.3.4", EndpointClass::Admin, AccessKind::Write);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs(), 60);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.check("1.2.3.4", EndpointClass::Admin, AccessKind::Write).allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn buckets_are_independent_per_class_kind_and_client() {
        let limiter = limiter(1, 1, 1);

        assert!(limiter.check("a", EndpointClass::Admin, AccessKind::Write).allowed);
        assert!(limiter.check("a", EndpointClass::Admin, AccessKind::Read).allowed);
        assert!(limiter.check("a", EndpointClass::Public, AccessKind::Read).allowed);
        assert!(limiter.check("b", EndpointClass::Admin, AccessKind::Write).allowed);
        assert!(!limiter.check("a", EndpointClass::Admin, AccessKind::Write).allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn info_does_not_consume() {
        let limiter = limiter(3, 3, 3);
        limiter.check("a", EndpointClass::Admin, AccessKind::Write);

        let first = limiter.info("a", EndpointClass::Admin, AccessKind::Write);
        let second = limiter.info("a", EndpointClass::Admin, AccessKind::Write);
        assert_eq!(first.remaining, 2);
        assert_eq!(second.remaining, 2);

        let fresh = limiter.info("z", EndpointClass::Public, AccessKind::Read);
        assert_eq!(fresh.remaining, 3);
        assert_eq!(fresh.reset_after, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_expired_windows() {
        let limiter = limiter(5, 5, 5);
        limiter.check("a", EndpointClass::Public, AccessKind::Read);
        limiter.check("b", EndpointClass::Public, AccessKind::Read);
        assert_eq!(limiter.tracked_clients(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.check("c", EndpointClass::Public, AccessKind::Read);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn client_ip_prefers_cdn_header_then_forwarded_for() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.9:4000".parse().expect("addr");
        assert_eq!(client_ip(&headers, Some(peer)), "10.0.0.9");
        assert_eq!(client_ip(&headers, None), UNKNOWN_CLIENT);

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.5");

        headers.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.7"));
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.7");
    }

    #[test]
    fn access_kind_follows_method() {
        assert_eq!(AccessKind::from_method(&Method::GET), AccessKind::Read);
        assert_eq!(AccessKind::from_method(&Method::PUT), AccessKind::Write);
        assert_eq!(AccessKind::from_method(&Method::POST), AccessKind::Write);
    }
}
