use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error, Error,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::{Duration, Instant},
};

const WINDOW: Duration = Duration::from_secs(60);
const UNLIMITED_PATHS: [&str; 2] = ["/health", "/metrics"];

/// Request count and window start per client, plus when stale windows were
/// last dropped.
struct Counters {
    windows: HashMap<String, (usize, Instant)>,
    last_sweep: Instant,
}

type Windows = Arc<Mutex<Counters>>;

/// Fixed one-minute window per client address. Clones share their counters.
#[derive(Clone)]
pub struct RateLimiter {
    requests_per_minute: usize,
    windows: Windows,
}

impl RateLimiter {
    pub fn new(requests_per_minute: usize) -> Self {
        RateLimiter {
            requests_per_minute,
            windows: Arc::new(Mutex::new(Counters {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Counts the request against `key`, returning false once the window is
    /// used up.
    fn check(windows: &Windows, limit: usize, key: &str, now: Instant) -> bool {
        let mut counters = windows.lock().unwrap_or_else(|e| e.into_inner());

        // Expired windows carry no state, so clients that went quiet are dropped
        if now.saturating_duration_since(counters.last_sweep) > WINDOW {
            counters
                .windows
                .retain(|_, (_, started)| now.saturating_duration_since(*started) <= WINDOW);
            counters.last_sweep = now;
        }

        let window = counters.windows.entry(key.to_string()).or_insert((0, now));
        if now.saturating_duration_since(window.1) > WINDOW {
            *window = (0, now);
        }
        if window.0 >= limit {
            return false;
        }
        window.0 += 1;
        true
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterMiddleware {
            service,
            requests_per_minute: self.requests_per_minute,
            windows: self.windows.clone(),
        })
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    requests_per_minute: usize,
    windows: Windows,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !UNLIMITED_PATHS.contains(&req.path()) {
            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            if !RateLimiter::check(&self.windows, self.requests_per_minute, &ip, Instant::now()) {
                tracing::warn!("Rate limit exceeded for {}", ip);
                return Box::pin(async move {
                    Err(error::ErrorTooManyRequests(
                        "Rate limit exceeded. Try again later.",
                    ))
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
