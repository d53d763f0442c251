use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

const MAX_REQUESTS: u32 = 5;
const WINDOW_SECS: u64 = 60;

/// In-memory per-key rate limiting (single-instance deployments).
#[derive(Clone, Default)]
pub struct RateLimitState {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

struct Bucket {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit for `key`. Returns remaining budget, or the time until
    /// the window resets when the key is over its limit.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(WINDOW_SECS);

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) > window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= MAX_REQUESTS {
            return Err(window.saturating_sub(now.duration_since(bucket.window_start)));
        }

        bucket.count += 1;
        Ok(MAX_REQUESTS - bucket.count)
    }

    /// Drop buckets whose window expired long ago.
    pub async fn cleanup(&self) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let keep_for = Duration::from_secs(WINDOW_SECS * 2);

        buckets.retain(|_, bucket| now.duration_since(bucket.window_start) < keep_for);
    }
}

/// Periodically purge expired buckets so the map cannot grow unbounded.
pub fn spawn_cleanup_worker(state: RateLimitState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(WINDOW_SECS * 2));
        loop {
            ticker.tick().await;
            state.cleanup().await;
        }
    });
}

/// Rate limiting middleware for the public auth endpoints, keyed by
/// IP + path so login and register have separate budgets.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = addr.ip().to_string();
    let path = req.uri().path().to_string();
    let key = format!("{}:{}", ip, path);

    match state.rate_limiter.check(&key).await {
        Ok(remaining) => {
            tracing::debug!(ip = %ip, path = %path, remaining = remaining, "Rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                ip = %ip,
                path = %path,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let limiter = RateLimitState::new();

        for i in 0..MAX_REQUESTS {
            let result = limiter.check("key").await;
            assert!(result.is_ok(), "request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn blocks_requests_over_the_limit() {
        let limiter = RateLimitState::new();

        for _ in 0..MAX_REQUESTS {
            let _ = limiter.check("key").await;
        }

        assert!(limiter.check("key").await.is_err());
    }

    #[tokio::test]
    async fn keys_have_separate_budgets() {
        let limiter = RateLimitState::new();

        for _ in 0..MAX_REQUESTS {
            let _ = limiter.check("key1").await;
        }

        assert!(limiter.check("key2").await.is_ok());
    }
}
