use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::config::types::RateLimitConfig;
use crate::ports::rate_limiter::RateLimiter;

const FALLBACK_TRACKED_KEYS: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter per key, held in memory.
///
/// Only the most recently seen keys are tracked; a key pushed out of the LRU
/// starts a fresh window the next time it shows up.
pub struct MemoryRateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<LruCache<String, Window>>,
}

impl MemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration, max_tracked_keys: usize) -> Self {
        if max_requests == 0 {
            tracing::warn!("Rate limiter initialized with max_requests = 0, no rate limiting applied");
        }
        let cap = NonZeroUsize::new(max_tracked_keys).unwrap_or_else(|| {
            tracing::warn!("Rate limiter max_tracked_keys was 0, defaulting to {FALLBACK_TRACKED_KEYS}");
            FALLBACK_TRACKED_KEYS
        });
        Self {
            max_requests,
            window,
            windows: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            config.max_tracked_keys,
        )
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn try_consume(&self, key: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        let Ok(mut windows) = self.windows.lock() else {
            tracing::error!("Rate limiter lock poisoned on try_consume('{key}'), allowing request");
            return true;
        };

        let now = Instant::now();
        if let Some(window) = windows.get_mut(key) {
            if now.duration_since(window.started) >= self.window {
                window.started = now;
                window.count = 0;
            }
            if window.count >= self.max_requests {
                tracing::warn!(key, limit = self.max_requests, "Rate limit exceeded");
                return false;
            }
            window.count += 1;
            return true;
        }

        windows.put(
            key.to_string(),
            Window {
                started: now,
                count: 1,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = MemoryRateLimiter::new(3, Duration::from_secs(60), 10);
        assert!(limiter.try_consume("10.0.0.1"));
        assert!(limiter.try_consume("10.0.0.1"));
        assert!(limiter.try_consume("10.0.0.1"));
        assert!(!limiter.try_consume("10.0.0.1"));
        assert!(!limiter.try_consume("10.0.0.1"));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = MemoryRateLimiter::new(1, Duration::from_secs(60), 10);
        assert!(limiter.try_consume("a"));
        assert!(!limiter.try_consume("a"));
        assert!(limiter.try_consume("b"));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = MemoryRateLimiter::new(1, Duration::from_millis(20), 10);
        assert!(limiter.try_consume("a"));
        assert!(!limiter.try_consume("a"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.try_consume("a"));
    }

    #[test]
    fn zero_limit_disables_throttling() {
        let limiter = MemoryRateLimiter::new(0, Duration::from_secs(60), 10);
        for _ in 0..100 {
            assert!(limiter.try_consume("a"));
        }
    }

    #[test]
    fn evicted_key_starts_fresh() {
        let limiter = MemoryRateLimiter::new(1, Duration::from_secs(60), 2);
        assert!(limiter.try_consume("a"));
        assert!(limiter.try_consume("b"));
        assert!(limiter.try_consume("c"));
        // "a" was least recently used and has been evicted
        assert!(limiter.try_consume("a"));
        assert!(!limiter.try_consume("c"));
    }

    #[test]
    fn zero_capacity_fallback() {
        let limiter = MemoryRateLimiter::new(1, Duration::from_secs(60), 0);
        assert!(limiter.try_consume("a"));
        assert!(!limiter.try_consume("a"));
    }

    #[test]
    fn concurrent_access_respects_limit() {
        use std::sync::Arc;
        let limiter = Arc::new(MemoryRateLimiter::new(5, Duration::from_secs(60), 10));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let l = Arc::clone(&limiter);
                std::thread::spawn(move || l.try_consume("shared"))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 5);
    }

    #[test]
    fn from_config_uses_limits() {
        let config = RateLimitConfig {
            max_requests: 2,
            window_secs: 60,
            max_tracked_keys: 4,
        };
        let limiter = MemoryRateLimiter::from_config(&config);
        assert!(limiter.try_consume("a"));
        assert!(limiter.try_consume("a"));
        assert!(!limiter.try_consume("a"));
    }
}
