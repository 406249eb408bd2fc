//! Visitor identity abstraction.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// A value that identifies a visitor.
///
/// Anything hashable and comparable qualifies, e.g. an `IpAddr` or an API key.
pub trait VisitorId: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> VisitorId for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Derives a visitor identity from an incoming request.
///
/// The embedding application supplies the strategy; the limiter calls
/// `identify` once per request and never looks inside the error.
pub trait IdentityResolver: Send + Sync {
    /// The request type this resolver understands.
    type Request: ?Sized;
    /// The identity the limiter keys its table on.
    type Id: VisitorId;
    /// Why an identity could not be derived.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Derive the visitor identity for `request`.
    fn identify(&self, request: &Self::Request) -> Result<Self::Id, Self::Error>;
}

impl<T> IdentityResolver for Arc<T>
where
    T: IdentityResolver + ?Sized,
{
    type Request = T::Request;
    type Id = T::Id;
    type Error = T::Error;

    fn identify(&self, request: &Self::Request) -> Result<Self::Id, Self::Error> {
        (**self).identify(request)
    }
}
