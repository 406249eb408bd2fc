//! Continuous-refill token bucket.

use tokio::time::Instant;

/// A token bucket that refills continuously at a fixed rate.
///
/// The bucket is not synchronized on its own; the visitor table serializes
/// every access to it.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Tokens added per second
    rate: f64,
    /// Maximum tokens the bucket can hold
    capacity: f64,
    /// Token level as of `last_update`
    tokens: f64,
    /// When the level was last brought up to date
    last_update: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(rate: f64, capacity: u32, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self {
            rate,
            capacity,
            tokens: capacity,
            last_update: now,
        }
    }

    /// Refill up to `now`, then take one token if one is available.
    ///
    /// Returns `true` if a token was consumed. On failure the level is left as
    /// refilled; it never goes negative.
    pub fn try_consume(&mut self, now: Instant) -> bool {
        self.tokens = self.available(now);
        if now > self.last_update {
            self.last_update = now;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// The token level at `now`, without consuming anything.
    pub fn available(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        (self.tokens + elapsed * self.rate).min(self.capacity)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}
