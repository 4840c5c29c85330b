// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-IP rate limiting.
//!
//! Each client IP may burst up to `max_requests`; capacity refills evenly so
//! that a full burst is available again after one window. Responses carry the
//! `RateLimit-Limit`, `RateLimit-Remaining` and `RateLimit-Reset` headers; a
//! request over the limit gets 429 with `Retry-After`.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::StateInformationMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

type KeyedLimiter = governor::RateLimiter<
    IpAddr,
    DefaultKeyedStateStore<IpAddr>,
    DefaultClock,
    StateInformationMiddleware,
>;

/// Result of counting one request against a client's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32, reset_after: Duration },
    Limited { retry_after: Duration },
}

pub struct RateLimiter {
    max_requests: NonZeroU32,
    /// Time to regain one request of capacity.
    period: Duration,
    limiter: KeyedLimiter,
    clock: DefaultClock,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let period = (window / max_requests.get()).max(Duration::from_nanos(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests);

        Self {
            max_requests,
            period: quota.replenish_interval(),
            limiter: governor::RateLimiter::keyed(quota)
                .with_middleware::<StateInformationMiddleware>(),
            clock: DefaultClock::default(),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests.get()
    }

    /// Count a request from `ip`.
    pub fn check(&self, ip: IpAddr) -> RateDecision {
        match self.limiter.check_key(&ip) {
            Ok(snapshot) => {
                let remaining = snapshot.remaining_burst_capacity();
                RateDecision::Allowed {
                    remaining,
                    reset_after: self.period * self.max_requests.get().saturating_sub(remaining),
                }
            }
            Err(not_until) => RateDecision::Limited {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    /// Forget clients whose capacity has fully refilled; returns how many
    /// were dropped.
    pub fn purge_stale(&self) -> usize {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        before.saturating_sub(self.limiter.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Seconds rounded up, so a client never retries early.
fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn set_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_after: Duration) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(reset_after)));
}

/// Middleware applying the shared [`RateLimiter`] to every request.
///
/// Without connection info (e.g. requests driven through `oneshot` in tests)
/// all requests share the unspecified address.
pub async fn rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let limiter = &state.rate_limiter;
    match limiter.check(ip) {
        RateDecision::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            set_limit_headers(
                response.headers_mut(),
                limiter.max_requests(),
                remaining,
                reset_after,
            );
            response
        }
        RateDecision::Limited { retry_after } => {
            tracing::warn!(ip = %ip, "Rate limit exceeded");
            let mut response = AppError::RateLimited {
                retry_after_secs: ceil_secs(retry_after),
            }
            .into_response();
            set_limit_headers(response.headers_mut(), limiter.max_requests(), 0, retry_after);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(30));

        for expected_remaining in [2, 1, 0] {
            match limiter.check(ip(1)) {
                RateDecision::Allowed { remaining, .. } => assert_eq!(remaining, expected_remaining),
                other => panic!("unexpected {other:?}"),
            }
        }
        match limiter.check(ip(1)) {
            RateDecision::Limited { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= Duration::from_secs(10));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reset_covers_spent_capacity() {
        let limiter = RateLimiter::new(3, Duration::from_secs(30));

        match limiter.check(ip(1)) {
            RateDecision::Allowed { reset_after, .. } => {
                assert_eq!(reset_after, Duration::from_secs(10))
            }
            other => panic!("unexpected {other:?}"),
        }
        match limiter.check(ip(1)) {
            RateDecision::Allowed { reset_after, .. } => {
                assert_eq!(reset_after, Duration::from_secs(20))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn capacity_refills_after_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));

        assert!(matches!(limiter.check(ip(1)), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check(ip(1)), RateDecision::Limited { .. }));
        std::thread::sleep(Duration::from_millis(80));
        assert!(matches!(limiter.check(ip(1)), RateDecision::Allowed { .. }));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));

        assert!(matches!(limiter.check(ip(1)), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check(ip(2)), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check(ip(1)), RateDecision::Limited { .. }));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn purge_drops_refilled_clients() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));

        assert!(matches!(limiter.check(ip(1)), RateDecision::Allowed { .. }));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(limiter.purge_stale(), 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn zero_limit_allows_one_request() {
        let limiter = RateLimiter::new(0, Duration::from_secs(10));
        assert_eq!(limiter.max_requests(), 1);
        assert!(matches!(limiter.check(ip(1)), RateDecision::Allowed { .. }));
    }

    #[test]
    fn ceil_secs_rounds_up() {
        assert_eq!(ceil_secs(Duration::from_millis(0)), 0);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::from_secs(10)), 10);
        assert_eq!(ceil_secs(Duration::from_millis(9_001)), 10);
    }
}
