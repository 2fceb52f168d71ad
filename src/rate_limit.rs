//! Rate limiting for the login and signup endpoints.
//!
//! Token bucket per client IP, taken from the connection's peer address.

use std::net::{IpAddr, SocketAddr};
use std::{num::NonZeroU32, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};

use crate::api::ApiError;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const SIGNUP_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();

#[derive(Clone)]
pub struct RateLimitConfig {
    /// Login attempts (default: burst of 5, refilling 1 per second)
    pub login: Arc<IpLimiter>,
    /// Signups (default: 3 per minute)
    pub signup: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new(login_per_sec: NonZeroU32, login_burst: NonZeroU32, signup_per_min: NonZeroU32) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(login_per_sec).allow_burst(login_burst),
            )),
            signup: Arc::new(RateLimiter::keyed(Quota::per_minute(signup_per_min))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(LOGIN_PER_SEC, LOGIN_BURST, SIGNUP_PER_MIN)
    }
}

fn client_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn check(limiter: &IpLimiter, request: &Request, message: &str) -> Result<(), Response> {
    let Some(ip) = client_ip(request) else {
        return Err(ApiError::forbidden("Unable to determine client IP.").into_response());
    };
    limiter.check_key(&ip).map_err(|_| {
        tracing::warn!(%ip, path = %request.uri().path(), "Rate limit exceeded");
        ApiError::too_many_requests(message).into_response()
    })
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.login,
        &request,
        "Too many login attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting signups.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.signup,
        &request,
        "Too many signup attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(ip: [u8; 4]) -> Request {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        request
    }

    #[test]
    fn test_burst_then_limited_per_ip() {
        let config = RateLimitConfig::new(
            NonZeroU32::new(1).unwrap(),
            NonZeroU32::new(2).unwrap(),
            NonZeroU32::new(1).unwrap(),
        );
        let a = request_from([10, 0, 0, 1]);
        let b = request_from([10, 0, 0, 2]);

        assert!(check(&config.login, &a, "slow down").is_ok());
        assert!(check(&config.login, &a, "slow down").is_ok());
        let limited = check(&config.login, &a, "slow down").unwrap_err();
        assert_eq!(limited.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);

        // Other clients have their own bucket.
        assert!(check(&config.login, &b, "slow down").is_ok());
    }

    #[test]
    fn test_missing_peer_address_is_forbidden() {
        let config = RateLimitConfig::default();
        let request = Request::new(Body::empty());
        let response = check(&config.signup, &request, "slow down").unwrap_err();
        assert_eq!(response.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
