//! Request Rate Limiter
//!
//! Global throttle enforcing a minimum inter-request interval derived
//! from a requests-per-minute ceiling (800/min => ~75ms between
//! requests). A rolling one-minute counter is kept for diagnostics;
//! the minimum interval is the only hard gate.

use std::time::{Duration, Instant};

/// Simple global throttle, not a token bucket
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_minute: u32,
    min_interval: Duration,
    last_request: Option<Instant>,
    window_start: Instant,
    requests_in_window: u32,
    total_requests: u64,
    total_wait: Duration,
}

impl RateLimiter {
    /// Create a limiter for the given requests-per-minute ceiling
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self {
            requests_per_minute: rpm,
            min_interval: Duration::from_secs_f64(60.0 / rpm as f64),
            last_request: None,
            window_start: Instant::now(),
            requests_in_window: 0,
            total_requests: 0,
            total_wait: Duration::ZERO,
        }
    }

    /// Block until it is safe to issue the next request, then record it
    ///
    /// Sleeps for the remainder of the minimum interval since the last
    /// request. The first request goes through immediately.
    pub async fn throttle(&mut self) {
        self.roll_window();

        if let Some(last) = self.last_request {
            let since = last.elapsed();
            if since < self.min_interval {
                let wait = self.min_interval - since;
                self.total_wait += wait;
                tokio::time::sleep(wait).await;
            }
        }

        self.last_request = Some(Instant::now());
        self.requests_in_window += 1;
        self.total_requests += 1;
    }

    /// The enforced minimum inter-request interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Requests recorded in the current one-minute window (diagnostic)
    pub fn requests_in_window(&mut self) -> u32 {
        self.roll_window();
        self.requests_in_window
    }

    /// Requests recorded since creation
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Cumulative time spent sleeping in throttle()
    pub fn total_wait(&self) -> Duration {
        self.total_wait
    }

    fn roll_window(&mut self) {
        if self.window_start.elapsed() >= Duration::from_secs(60) {
            self.window_start = Instant::now();
            self.requests_in_window = 0;
        }
    }
}
