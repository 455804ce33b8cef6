//! Per-client request rate limiting
//!
//! Keyed by peer IP from `ConnectInfo`. Requests without connection info
//! (in-process tests) share the unspecified address bucket.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub type ClientRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Tracked client count above which idle buckets are dropped
const RETAIN_THRESHOLD: usize = 10_000;

/// Limiter allowing `per_minute` requests per client; `None` when 0
pub fn client_rate_limiter(per_minute: u32) -> Option<Arc<ClientRateLimiter>> {
    let per_minute = NonZeroU32::new(per_minute)?;
    Some(Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))))
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.rate_limiter {
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        if limiter.len() > RETAIN_THRESHOLD {
            limiter.retain_recent();
        }

        if limiter.check_key(&client).is_err() {
            warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
            return Err(ApiError::TooManyRequests);
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_disables_limiter() {
        assert!(client_rate_limiter(0).is_none());
    }

    #[test]
    fn test_quota_is_per_client() {
        let limiter = client_rate_limiter(2).unwrap();
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_err());
        assert!(limiter.check_key(&b).is_ok());
    }
}
