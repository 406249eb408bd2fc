//! Rate limiting interceptor for tonic services.

use std::sync::Arc;

use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::warn;

use crate::ratelimit::{Decision, IdentityResolver, RateLimiter};

/// A tonic interceptor that admits each call through a [`RateLimiter`].
///
/// Rejected calls fail with `RESOURCE_EXHAUSTED`. Calls whose visitor cannot
/// be identified fail with `INTERNAL` and never reach the limiter's table.
pub struct RateLimitInterceptor<I: IdentityResolver> {
    /// The rate limiter instance
    rate_limiter: Arc<RateLimiter<I>>,
}

impl<I: IdentityResolver> RateLimitInterceptor<I> {
    /// Create a new interceptor with the given rate limiter.
    pub fn new(rate_limiter: Arc<RateLimiter<I>>) -> Self {
        Self { rate_limiter }
    }
}

impl<I: IdentityResolver> Clone for RateLimitInterceptor<I> {
    fn clone(&self) -> Self {
        Self {
            rate_limiter: Arc::clone(&self.rate_limiter),
        }
    }
}

impl<I> Interceptor for RateLimitInterceptor<I>
where
    I: IdentityResolver<Request = Request<()>>,
{
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        match self.rate_limiter.admit(&request) {
            Ok(Decision::Allow) => Ok(request),
            Ok(Decision::Reject) => Err(Status::resource_exhausted("Too Many Requests")),
            Err(e) => {
                warn!(error = %e, "Could not identify visitor");
                Err(Status::internal("Internal Server Error"))
            }
        }
    }
}
