//! Rate limiting middleware for Axum

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

/// Client key used when the peer address is unknown
const ANONYMOUS_CLIENT: &str = "anonymous";

/// Tracked clients beyond which stale windows are pruned
const PRUNE_THRESHOLD: usize = 1024;

/// Fixed-window request counter per client address
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    /// client -> (window start, requests in window)
    clients: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request from `client`; false once the window's quota is spent
    pub async fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;

        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, (start, _)| now.duration_since(*start) < window);
        }

        let slot = clients.entry(client.to_string()).or_insert((now, 0));
        if now.duration_since(slot.0) >= self.window {
            *slot = (now, 0);
        }
        slot.1 += 1;

        slot.1 <= self.max_requests
    }
}

/// Reject requests over the per-client quota with 429
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string());

    if !limiter.check(&client).await {
        warn!("Rate limit exceeded for {}", client);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Try again later.",
        )
            .into_response();
    }

    next.run(request).await
}
