//! Per-visitor rate limiting logic and state management.

mod bucket;
mod eviction;
mod identity;
mod limiter;
mod visitor;

pub use bucket::TokenBucket;
pub use eviction::EvictionTask;
pub use identity::{IdentityResolver, VisitorId};
pub use limiter::{Decision, RateLimiter};
pub use visitor::VisitorTable;
