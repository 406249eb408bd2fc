//! Core rate limiter implementation.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;

use super::eviction::EvictionTask;
use super::identity::IdentityResolver;
use super::visitor::VisitorTable;
use crate::config::LimiterConfig;
use crate::error::{Result, TurnstileError};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The visitor had a token; forward the request.
    Allow,
    /// The visitor's budget is exhausted; refuse the request.
    Reject,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Per-visitor token-bucket rate limiter.
///
/// Every visitor gets its own bucket, created on its first request and
/// forgotten by a background task once it has been idle past the staleness
/// threshold. The limiter is thread-safe and is meant to be shared behind an
/// `Arc`.
pub struct RateLimiter<I: IdentityResolver> {
    config: LimiterConfig,
    /// Shared with the eviction task
    visitors: Arc<VisitorTable<I::Id>>,
    resolver: I,
    eviction: EvictionTask,
}

impl<I: IdentityResolver> RateLimiter<I> {
    /// Create a limiter and start its eviction task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: LimiterConfig, resolver: I) -> Result<Self> {
        config.validate()?;

        let visitors = Arc::new(VisitorTable::new(config.requests_per_second, config.burst));
        let eviction = EvictionTask::spawn(
            Arc::clone(&visitors),
            config.eviction_interval(),
            config.staleness_threshold(),
        )?;

        debug!(
            requests_per_second = config.requests_per_second,
            burst = config.burst,
            "Rate limiter initialized"
        );

        Ok(Self {
            config,
            visitors,
            resolver,
            eviction,
        })
    }

    /// Create a limiter with the given rate and burst and default eviction timings.
    pub fn with_rate(requests_per_second: f64, burst: u32, resolver: I) -> Result<Self> {
        Self::new(LimiterConfig::new(requests_per_second, burst), resolver)
    }

    /// Decide whether `request` may proceed.
    ///
    /// Fails only when the resolver cannot identify the visitor, in which case
    /// no visitor state is touched.
    pub fn admit(&self, request: &I::Request) -> Result<Decision> {
        let id = self
            .resolver
            .identify(request)
            .map_err(|e| TurnstileError::IdentityResolution(Box::new(e)))?;

        let decision = self.visitors.admit(&id, Instant::now());
        if decision == Decision::Reject {
            debug!(visitor = ?id, "Rate limit exceeded");
        }

        Ok(decision)
    }

    /// Number of visitors currently tracked.
    pub fn visitor_count(&self) -> usize {
        self.visitors.len()
    }

    /// Whether `id` currently has an entry.
    pub fn is_tracking(&self, id: &I::Id) -> bool {
        self.visitors.contains(id)
    }

    /// Tokens `id` has available right now, if it is tracked.
    pub fn available_tokens(&self, id: &I::Id) -> Option<f64> {
        self.visitors.available_tokens(id, Instant::now())
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Stop the eviction task and wait for it to exit.
    pub async fn shutdown(self) {
        debug!(visitors = self.visitors.len(), "Shutting down rate limiter");
        self.eviction.shutdown().await;
    }
}
