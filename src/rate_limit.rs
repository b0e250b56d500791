use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::{debug, warn};
use serde_json::json;
use tokio::sync::Mutex;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

#[derive(Debug, PartialEq)]
pub enum Decision {
    Allowed { remaining: u32, reset: Duration },
    Denied { reset: Duration },
}

/// Counts requests per client over fixed windows. A client's window starts
/// with its first request and is replaced once it has run its full length.
pub struct FixedWindowLimiter {
    quota: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

pub type RateLimiterHandle = Arc<FixedWindowLimiter>;

impl FixedWindowLimiter {
    pub fn new(quota: u32, window: Duration) -> FixedWindowLimiter {
        FixedWindowLimiter {
            quota,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub async fn check(&self, client: IpAddr) -> Decision {
        self.check_at(client, Instant::now()).await
    }

    async fn check_at(&self, client: IpAddr, now: Instant) -> Decision {
        let mut windows = self.windows.lock().await;
        let window = windows.entry(client).or_insert(Window {
            start: now,
            count: 0,
        });
        if now.duration_since(window.start) >= self.window {
            *window = Window {
                start: now,
                count: 0,
            };
        }
        let reset = (window.start + self.window).saturating_duration_since(now);
        if window.count >= self.quota {
            return Decision::Denied { reset };
        }
        window.count += 1;
        Decision::Allowed {
            remaining: self.quota - window.count,
            reset,
        }
    }

    /// Drops every window that has run out. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        self.prune_at(Instant::now()).await
    }

    async fn prune_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| now.duration_since(window.start) < self.window);
        before - windows.len()
    }

    async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }
}

/// Periodically clears out windows of clients that went quiet.
pub fn spawn_pruning(limiter: RateLimiterHandle) {
    let period = limiter.window;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = limiter.prune().await;
            if removed > 0 {
                debug!(
                    "Pruned {} rate limit windows, {} remaining",
                    removed,
                    limiter.tracked_clients().await
                );
            }
        }
    });
}

fn client_address(request: &Request) -> IpAddr {
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip(),
        // Only happens when the router is served without connect info.
        None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    }
}

fn limit_headers(quota: u32, remaining: u32, reset: Duration) -> HeaderMap {
    let reset_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        + reset;
    let mut headers = HeaderMap::new();
    headers.insert(LIMIT_HEADER, HeaderValue::from(quota));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(reset_at.as_secs()));
    headers
}

pub async fn limit(
    State(limiter): State<RateLimiterHandle>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_address(&request);
    match limiter.check(client).await {
        Decision::Allowed { remaining, reset } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .extend(limit_headers(limiter.quota(), remaining, reset));
            response
        }
        Decision::Denied { reset } => {
            warn!("Rate limit exceeded for {}", client);
            let mut headers = limit_headers(limiter.quota(), 0, reset);
            // Round up so a client honouring the header lands in the next window.
            let retry_after = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                Json(json!({"error": "rate limit exceeded"})),
            )
                .into_response()
        }
    }
}
