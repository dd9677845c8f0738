use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{
    cache::keys::rate_limit_key,
    config::Config,
    utils::{error_codes, error_to_api_response},
};

/// Fixed-window request counter per client IP, kept in Redis.
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Config) -> Self {
        Self {
            redis,
            config: Arc::new(config),
        }
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, StatusCode> {
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());
        let ip = client_ip(req.headers(), remote_ip.as_deref());
        tracing::debug!("rate limit check for {}", ip);

        let key = rate_limit_key(&ip);
        let mut conn = self
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                tracing::error!("rate limiter cannot reach redis: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        let count: i64 = conn
            .incr(&key, 1)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        if count == 1 {
            let _: () = conn
                .expire(&key, self.config.rate_limit_window().as_secs() as i64)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        if count > i64::from(self.config.rate_limit_requests) {
            tracing::warn!("rate limit exceeded for {}", ip);
            return Ok((
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    format!(
                        "Zu viele Anfragen, bitte in {} Sekunden erneut versuchen",
                        self.config.rate_limit_window().as_secs()
                    ),
                ),
            )
                .into_response());
        }

        Ok(next.run(req).await)
    }
}

/// `x-real-ip`, then the first `x-forwarded-for` entry, then the peer address.
fn client_ip(headers: &HeaderMap, remote_ip: Option<&str>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip)
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    limiter.check_rate_limit(req, next).await
}
