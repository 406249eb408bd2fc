//! Error types for Turnstile.

use thiserror::Error;

/// Boxed error produced by an identity resolver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for Turnstile operations.
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The identity resolver could not derive a visitor from the request
    #[error("Identity resolution failed: {0}")]
    IdentityResolution(#[source] BoxError),

    /// No Tokio runtime was available to host the eviction task
    #[error("Runtime error: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),
}

/// Result type alias for Turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
