//! # Request Throttling
//!
//! Global requests-per-second ceiling for the HTTP API.
//!
//! A single [`Throttle`] guards every endpoint; the ceiling comes from
//! `TESSERA_RATE_LIMIT` (default 100). Requests over the ceiling get a
//! 429 with a `Retry-After` hint instead of queueing.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

const DEFAULT_RPS: NonZeroU32 = NonZeroU32::new(100).unwrap();

// =============================================================================
// THROTTLE
// =============================================================================

/// Shared requests-per-second gate, cloned into the middleware state.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    per_second: u32,
}

impl Throttle {
    /// Build a throttle admitting `per_second` requests each second.
    ///
    /// Zero falls back to the default ceiling.
    #[must_use]
    pub fn new(per_second: u32) -> Self {
        let rps = NonZeroU32::new(per_second).unwrap_or(DEFAULT_RPS);
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            per_second: rps.get(),
        }
    }

    /// Build a throttle from `TESSERA_RATE_LIMIT`.
    ///
    /// Unset or unparseable values fall back to the default ceiling.
    #[must_use]
    pub fn from_env() -> Self {
        let per_second = std::env::var("TESSERA_RATE_LIMIT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| DEFAULT_RPS.get());
        Self::new(per_second)
    }

    /// The admitted requests per second.
    #[must_use]
    pub fn per_second(&self) -> u32 {
        self.per_second
    }

    /// Try to admit one request right now.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Shed requests over the ceiling with 429 and a `Retry-After` hint.
pub async fn throttle_requests(
    State(throttle): State<Throttle>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if throttle.try_acquire() {
        return next.run(request).await;
    }
    tracing::warn!(
        per_second = throttle.per_second(),
        "request shed by throttle"
    );
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, "1")],
        "Too Many Requests",
    )
        .into_response()
}

// =============================================================================
// TESTS
// =============================================================================
