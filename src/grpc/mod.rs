//! gRPC middleware adapter.
//!
//! Puts a [`RateLimiter`](crate::ratelimit::RateLimiter) in front of tonic
//! services as an interceptor, with stock resolvers for keying visitors by
//! peer address or by a metadata value.

mod interceptor;
mod resolver;
mod server;

pub use interceptor::RateLimitInterceptor;
pub use resolver::{MetadataResolver, PeerIpResolver, ResolveError};
pub use server::GrpcServer;
