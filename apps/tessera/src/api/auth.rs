//! # API Key Authentication
//!
//! Bearer-token gate for the HTTP API, driven by `TESSERA_API_KEY`.
//!
//! The gate only exists when a key is configured: the router captures
//! the key at build time and installs [`require_api_key`] with it as
//! state. With no key, the middleware is never attached and every
//! request passes. Clients send either `Authorization: Bearer <key>`
//! or the raw key.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::{Choice, ConstantTimeEq};

// =============================================================================
// API KEY
// =============================================================================

/// The configured API secret, captured once at router build time.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Read the key from `TESSERA_API_KEY`.
    ///
    /// Unset and empty both mean authentication is off.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("TESSERA_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(Self)
    }

    /// Decide whether an Authorization header value carries this key.
    ///
    /// Accepts both `Bearer <key>` and the raw key. The comparison walks
    /// the same number of bytes wherever the first difference sits, and
    /// folds a length mismatch into the same verdict bit, so the timing
    /// does not narrow down the secret.
    #[must_use]
    pub fn accepts(&self, authorization: Option<&str>) -> bool {
        let Some(value) = authorization else {
            return false;
        };
        let candidate = value.strip_prefix("Bearer ").unwrap_or(value).as_bytes();
        let secret = self.0.as_bytes();

        let mut mismatch = Choice::from(u8::from(candidate.len() != secret.len()));
        for position in 0..candidate.len().max(secret.len()) {
            let left = candidate.get(position).copied().unwrap_or(0);
            let right = secret.get(position).copied().unwrap_or(0);
            mismatch |= left.ct_ne(&right);
        }
        !bool::from(mismatch)
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Reject requests that do not present the configured key.
///
/// `/health` stays open so load balancer probes keep working without
/// credentials.
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if key.accepts(authorization) {
        return Ok(next.run(request).await);
    }

    let reason = if authorization.is_some() {
        "invalid_api_key"
    } else {
        "missing_authorization_header"
    };
    tracing::warn!(event = "auth_failure", reason, "rejected request");
    Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
}

// =============================================================================
// TESTS
// =============================================================================
