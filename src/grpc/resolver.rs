//! Identity resolvers for tonic requests.

use std::net::IpAddr;

use thiserror::Error;
use tonic::Request;

use crate::ratelimit::IdentityResolver;

/// Why a visitor could not be identified from a gRPC request.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("peer address is not available")]
    MissingPeerAddr,

    #[error("metadata key `{0}` is missing")]
    MissingMetadata(String),

    #[error("metadata key `{0}` is not valid text")]
    InvalidMetadata(String),
}

/// Identifies visitors by the IP address of the connected peer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerIpResolver;

impl IdentityResolver for PeerIpResolver {
    type Request = Request<()>;
    type Id = IpAddr;
    type Error = ResolveError;

    fn identify(&self, request: &Request<()>) -> Result<IpAddr, ResolveError> {
        request
            .remote_addr()
            .map(|addr| addr.ip())
            .ok_or(ResolveError::MissingPeerAddr)
    }
}

/// Identifies visitors by the value of an ASCII metadata entry, such as an API key header.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    key: String,
}

impl MetadataResolver {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl IdentityResolver for MetadataResolver {
    type Request = Request<()>;
    type Id = String;
    type Error = ResolveError;

    fn identify(&self, request: &Request<()>) -> Result<String, ResolveError> {
        let value = request
            .metadata()
            .get(self.key.as_str())
            .ok_or_else(|| ResolveError::MissingMetadata(self.key.clone()))?;

        value
            .to_str()
            .map(str::to_string)
            .map_err(|_| ResolveError::InvalidMetadata(self.key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataValue;

    #[test]
    fn test_peer_ip_missing() {
        let request = Request::new(());
        let result = PeerIpResolver.identify(&request);
        assert!(matches!(result, Err(ResolveError::MissingPeerAddr)));
    }

    #[test]
    fn test_metadata_present() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("x-api-key", MetadataValue::from_static("client-a"));

        let resolver = MetadataResolver::new("x-api-key");
        assert_eq!(resolver.identify(&request).unwrap(), "client-a");
    }

    #[test]
    fn test_metadata_missing() {
        let request = Request::new(());
        let resolver = MetadataResolver::new("x-api-key");

        let err = resolver.identify(&request).unwrap_err();
        assert_eq!(err.to_string(), "metadata key `x-api-key` is missing");
    }
}
