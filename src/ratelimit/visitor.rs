//! The visitor table: per-visitor token buckets behind one exclusive lock.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use super::bucket::TokenBucket;
use super::identity::VisitorId;
use super::limiter::Decision;

/// State kept for one visitor.
#[derive(Debug, Clone)]
pub(crate) struct VisitorEntry {
    /// The visitor's token budget
    bucket: TokenBucket,
    /// Last time the visitor made a request, allowed or not
    last_seen: Instant,
}

impl VisitorEntry {
    fn new(bucket: TokenBucket, now: Instant) -> Self {
        Self {
            bucket,
            last_seen: now,
        }
    }

    fn touch(&mut self, now: Instant) {
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

/// Mapping from visitor identity to that visitor's entry.
///
/// A single mutex covers lookup, creation, consumption and eviction, so an
/// identity can never end up with two entries and an entry is never removed
/// while a request is consuming from it.
pub struct VisitorTable<K: VisitorId> {
    /// Refill rate for new buckets
    rate: f64,
    /// Capacity for new buckets
    burst: u32,
    visitors: Mutex<HashMap<K, VisitorEntry>>,
}

impl<K: VisitorId> VisitorTable<K> {
    /// Create an empty table whose buckets use the given rate and burst.
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            burst,
            visitors: Mutex::new(HashMap::new()),
        }
    }

    /// Look up or create the entry for `id` and try to consume one token.
    ///
    /// `last_seen` is refreshed whatever the outcome.
    pub fn admit(&self, id: &K, now: Instant) -> Decision {
        let mut visitors = self.visitors.lock();

        let entry = visitors.entry(id.clone()).or_insert_with(|| {
            trace!(visitor = ?id, rate = self.rate, burst = self.burst, "Creating visitor entry");
            VisitorEntry::new(TokenBucket::new(self.rate, self.burst, now), now)
        });

        let allowed = entry.bucket.try_consume(now);
        entry.touch(now);

        if allowed {
            Decision::Allow
        } else {
            Decision::Reject
        }
    }

    /// Remove every entry idle for strictly longer than `threshold` as of `now`.
    ///
    /// Returns the number of entries removed.
    pub fn evict_idle(&self, now: Instant, threshold: Duration) -> usize {
        let mut visitors = self.visitors.lock();
        let before = visitors.len();
        visitors.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= threshold);
        before - visitors.len()
    }

    /// Number of tracked visitors.
    pub fn len(&self) -> usize {
        self.visitors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.lock().is_empty()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.visitors.lock().contains_key(id)
    }

    /// When `id` was last seen, if it is tracked.
    pub fn last_seen(&self, id: &K) -> Option<Instant> {
        self.visitors.lock().get(id).map(VisitorEntry::last_seen)
    }

    /// Tokens `id` would have at `now`, if it is tracked.
    pub fn available_tokens(&self, id: &K, now: Instant) -> Option<f64> {
        self.visitors.lock().get(id).map(|entry| entry.bucket.available(now))
    }
}
