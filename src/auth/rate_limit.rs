// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login attempt throttling.
//!
//! Fixed window per `(source address, endpoint)`: the first attempt opens
//! a window, every attempt inside it counts, and once the count passes the
//! limit further attempts are refused until the window closes. Counters
//! live behind [`AttemptStore`] so a shared store can replace the
//! in-process LRU when running several instances.

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, OriginalUri, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lru::LruCache;
use tracing::warn;

use super::AuthError;
use crate::state::AppState;

const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after: Duration },
}

pub trait RateLimiter: Send + Sync {
    /// Count one attempt for `key` and decide whether it may proceed.
    fn check(&self, key: &str, now: Instant) -> RateLimitDecision;
}

/// Attempt counter for one key.
#[derive(Debug, Clone, Copy)]
pub struct AttemptWindow {
    pub count: u32,
    pub started_at: Instant,
}

/// Backing store for attempt counters.
pub trait AttemptStore: Send + Sync {
    /// Count an attempt, opening a fresh window if the current one has
    /// closed, and return the window after counting.
    fn record_attempt(&self, key: &str, window: Duration, now: Instant) -> AttemptWindow;
}

/// In-process store. Least recently seen sources are evicted first.
pub struct LruAttemptStore {
    windows: Mutex<LruCache<String, AttemptWindow>>,
}

impl LruAttemptStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            windows: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for LruAttemptStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AttemptStore for LruAttemptStore {
    fn record_attempt(&self, key: &str, window: Duration, now: Instant) -> AttemptWindow {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entry = match windows.get(key) {
            Some(current) if now.saturating_duration_since(current.started_at) < window => {
                AttemptWindow {
                    count: current.count.saturating_add(1),
                    started_at: current.started_at,
                }
            }
            _ => AttemptWindow {
                count: 1,
                started_at: now,
            },
        };
        windows.put(key.to_string(), entry);
        entry
    }
}

pub struct FixedWindowLimiter<S = LruAttemptStore> {
    store: S,
    max_attempts: u32,
    window: Duration,
}

impl<S: AttemptStore> FixedWindowLimiter<S> {
    pub fn new(store: S, max_attempts: u32, window: Duration) -> Self {
        Self {
            store,
            max_attempts,
            window,
        }
    }
}

impl<S: AttemptStore> RateLimiter for FixedWindowLimiter<S> {
    fn check(&self, key: &str, now: Instant) -> RateLimitDecision {
        let current = self.store.record_attempt(key, self.window, now);
        if current.count <= self.max_attempts {
            RateLimitDecision::Allowed
        } else {
            let reopens_at = current.started_at + self.window;
            RateLimitDecision::Limited {
                retry_after: reopens_at.saturating_duration_since(now),
            }
        }
    }
}

/// First `X-Forwarded-For` entry, else `X-Real-IP`.
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Throttle key for a request: source address and full request path.
///
/// The peer address wins unless proxy headers are trusted. Without either
/// (in-process tests) forwarded headers are used as a last resort.
pub fn attempt_key(request: &Request, trust_proxy_headers: bool) -> String {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let forwarded = forwarded_client_ip(request.headers());

    let source = if trust_proxy_headers {
        forwarded.or(peer)
    } else {
        peer.or(forwarded)
    };
    format!("{}|{}", source.as_deref().unwrap_or("unknown"), path)
}

/// Middleware placed on login routes only.
pub async fn limit_login_attempts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = attempt_key(&request, state.config.trust_proxy_headers);
    match state.login_limiter.check(&key, Instant::now()) {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited { retry_after } => {
            warn!(%key, retry_after_secs = retry_after.as_secs(), "login attempts throttled");
            AuthError::TooManyRequests { retry_after }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn limiter() -> FixedWindowLimiter {
        FixedWindowLimiter::new(LruAttemptStore::default(), 5, Duration::from_secs(900))
    }

    #[test]
    fn sixth_attempt_in_window_is_limited() {
        let limiter = limiter();
        let start = Instant::now();
        for i in 0..5 {
            assert_eq!(
                limiter.check("1.2.3.4|/api/auth/login", start + Duration::from_secs(i)),
                RateLimitDecision::Allowed
            );
        }
        let decision = limiter.check("1.2.3.4|/api/auth/login", start + Duration::from_secs(60));
        assert_eq!(
            decision,
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs(840)
            }
        );
    }

    #[test]
    fn window_reopens_after_expiry() {
        let limiter = limiter();
        let start = Instant::now();
        for _ in 0..6 {
            limiter.check("k", start);
        }
        assert_eq!(
            limiter.check("k", start + Duration::from_secs(900)),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..6 {
            limiter.check("1.2.3.4|/api/auth/login", now);
        }
        assert_eq!(
            limiter.check("1.2.3.4|/api/admin/login", now),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check("5.6.7.8|/api/auth/login", now),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn forwarded_ip_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(forwarded_client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn peer_address_wins_unless_proxy_trusted() {
        let mut request = Request::builder()
            .uri("/api/auth/login")
            .header("x-forwarded-for", "1.2.3.4")
            .body(axum::body::Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));

        assert_eq!(attempt_key(&request, false), "10.0.0.1|/api/auth/login");
        assert_eq!(attempt_key(&request, true), "1.2.3.4|/api/auth/login");
    }

    #[test]
    fn unknown_source_still_keys_by_path() {
        let request = Request::builder()
            .uri("/api/admin/login")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(attempt_key(&request, false), "unknown|/api/admin/login");
    }
}
