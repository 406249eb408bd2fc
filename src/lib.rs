//! Turnstile - per-visitor request-rate limiting
//!
//! This crate admits or rejects requests against a token-bucket budget kept
//! separately for every visitor. How a request maps to a visitor is supplied
//! by the embedding application through [`ratelimit::IdentityResolver`]; the
//! [`grpc`] module provides a tonic interceptor that puts the limiter in front
//! of any gRPC service.

pub mod config;
pub mod error;
pub mod grpc;
pub mod ratelimit;
