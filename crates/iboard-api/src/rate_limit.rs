//! Fixed-window, per-client-IP request limits applied at the HTTP boundary.
//!
//! These are deployment policy, not part of the vote protocol: the service
//! behaves the same with every limiter disabled, and clients are expected to
//! tolerate an occasional 429.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::ApiError;

/// Windows are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub max_requests: u32,
    pub window: Duration,
}

impl Quota {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Limits for each layer of the router. `None` disables that layer.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Every request under `/api`.
    pub general: Option<Quota>,
    /// Every request under `/api/ideas`.
    pub ideas: Option<Quota>,
    /// Votes (shared by upvote and downvote).
    pub writes: Option<Quota>,
    /// Idea creation.
    pub creates: Option<Quota>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general: Some(Quota::new(100, Duration::from_secs(15 * 60))),
            ideas: Some(Quota::new(50, Duration::from_secs(10 * 60))),
            writes: Some(Quota::new(20, Duration::from_secs(15 * 60))),
            creates: Some(Quota::new(10, Duration::from_secs(60 * 60))),
        }
    }
}

impl RateLimitConfig {
    pub fn unlimited() -> Self {
        Self {
            general: None,
            ideas: None,
            writes: None,
            creates: None,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    quota: Option<Quota>,
    message: &'static str,
    writes_only: bool,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(quota: Option<Quota>, message: &'static str) -> Self {
        Self::build(quota, message, false)
    }

    /// A limiter that lets GET/HEAD/OPTIONS through uncounted.
    pub fn for_writes(quota: Option<Quota>, message: &'static str) -> Self {
        Self::build(quota, message, true)
    }

    fn build(quota: Option<Quota>, message: &'static str, writes_only: bool) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                quota,
                message,
                writes_only,
                windows: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Count one request from `client` at `now`. On rejection returns the
    /// whole seconds until the client's window resets (at least 1).
    pub fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), u64> {
        let Some(quota) = self.inner.quota else {
            return Ok(());
        };

        // A poisoned table only loses counts; keep serving
        let mut windows = self
            .inner
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < quota.window);
        }

        let window = windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= quota.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= quota.max_requests {
            let remaining = quota.window.saturating_sub(now.duration_since(window.started));
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(secs.max(1));
        }

        window.count += 1;
        Ok(())
    }

    fn applies_to(&self, method: &Method) -> bool {
        !self.inner.writes_only
            || !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

/// Middleware: `axum::middleware::from_fn_with_state(limiter, enforce)`.
pub async fn enforce(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    if !limiter.applies_to(req.method()) {
        return next.run(req).await;
    }

    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check_at(client, Instant::now()) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            warn!(
                "Rate limit exceeded for {}: {} {}",
                client,
                req.method(),
                req.uri()
            );
            ApiError::RateLimited {
                message: limiter.inner.message.into(),
                retry_after,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8));

    fn limiter(max: u32, secs: u64) -> RateLimiter {
        RateLimiter::new(Some(Quota::new(max, Duration::from_secs(secs))), "slow down")
    }

    #[test]
    fn rejects_after_quota_until_window_resets() {
        let rl = limiter(2, 60);
        let t0 = Instant::now();

        assert!(rl.check_at(CLIENT, t0).is_ok());
        assert!(rl.check_at(CLIENT, t0).is_ok());
        assert_eq!(rl.check_at(CLIENT, t0 + Duration::from_millis(500)), Err(60));
        assert_eq!(rl.check_at(CLIENT, t0 + Duration::from_secs(59)), Err(1));

        assert!(rl.check_at(CLIENT, t0 + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn clients_are_counted_separately() {
        let rl = limiter(1, 60);
        let t0 = Instant::now();

        assert!(rl.check_at(CLIENT, t0).is_ok());
        assert!(rl.check_at(CLIENT, t0).is_err());
        assert!(rl.check_at(OTHER, t0).is_ok());
    }

    #[test]
    fn disabled_limiter_never_rejects() {
        let rl = RateLimiter::new(None, "unused");
        let t0 = Instant::now();
        for _ in 0..1000 {
            assert!(rl.check_at(CLIENT, t0).is_ok());
        }
    }

    #[test]
    fn write_limiter_ignores_reads() {
        let rl = RateLimiter::for_writes(Some(Quota::new(1, Duration::from_secs(1))), "x");
        assert!(!rl.applies_to(&Method::GET));
        assert!(rl.applies_to(&Method::POST));
    }
}
