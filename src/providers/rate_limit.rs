//! Sliding-window quota for external provider APIs

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    request_times: Vec<Instant>,
    last_cleanup: Instant,
}

/// Rate limiter for API requests.
///
/// Shared by reference between concurrent searches of one adapter.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests per window
    max_requests: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(Window {
                request_times: Vec::new(),
                last_cleanup: Instant::now(),
            }),
        }
    }

    pub fn per_hour(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(3600))
    }

    /// Check if a request is allowed and record it
    pub fn allow_request(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        self.cleanup_old_requests(&mut state);

        if state.request_times.len() >= self.max_requests as usize {
            false
        } else {
            state.request_times.push(Instant::now());
            true
        }
    }

    /// Requests still allowed in the current window
    #[must_use]
    pub fn remaining(&self) -> u32 {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        self.cleanup_old_requests(&mut state);
        let used = u32::try_from(state.request_times.len()).unwrap_or(u32::MAX);
        self.max_requests.saturating_sub(used)
    }

    /// Get time until next request is allowed
    pub fn time_until_next_request(&self) -> Duration {
        let Ok(mut state) = self.state.lock() else {
            return self.window;
        };
        self.cleanup_old_requests(&mut state);

        if state.request_times.len() < self.max_requests as usize {
            Duration::from_secs(0)
        } else if let Some(oldest) = state.request_times.first() {
            self.window.saturating_sub(oldest.elapsed())
        } else {
            Duration::from_secs(0)
        }
    }

    /// Remove requests older than the window
    fn cleanup_old_requests(&self, state: &mut Window) {
        let now = Instant::now();
        if now.duration_since(state.last_cleanup) >= self.window / 60 {
            if let Some(cutoff) = now.checked_sub(self.window) {
                state.request_times.retain(|&time| time > cutoff);
            }
            state.last_cleanup = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::per_hour(2);

        // Should allow first 2 requests
        assert!(limiter.allow_request());
        assert!(limiter.allow_request());

        // Should deny 3rd request
        assert!(!limiter.allow_request());
        assert_eq!(limiter.remaining(), 0);

        let wait_time = limiter.time_until_next_request();
        assert!(wait_time > Duration::from_secs(0));
    }

    #[test]
    fn test_window_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(60));
        assert!(limiter.allow_request());
        assert!(!limiter.allow_request());

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.allow_request());
    }
}
