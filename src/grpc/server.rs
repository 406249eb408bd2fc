//! gRPC server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server;
use tonic::Request;
use tracing::{error, info};

use super::interceptor::RateLimitInterceptor;
use crate::error::{Result, TurnstileError};
use crate::ratelimit::{IdentityResolver, RateLimiter};

/// gRPC server exposing the standard health service behind the rate limiter.
pub struct GrpcServer<I: IdentityResolver> {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter instance
    rate_limiter: Arc<RateLimiter<I>>,
}

impl<I> GrpcServer<I>
where
    I: IdentityResolver<Request = Request<()>> + 'static,
{
    /// Create a new gRPC server.
    pub fn new(addr: SocketAddr, rate_limiter: Arc<RateLimiter<I>>) -> Self {
        Self { addr, rate_limiter }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the gRPC server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let (_health_reporter, health_service) = tonic_health::server::health_reporter();
        let interceptor = RateLimitInterceptor::new(self.rate_limiter);

        info!(
            addr = %self.addr,
            "Starting gRPC server for Health with per-visitor rate limiting"
        );

        Server::builder()
            .add_service(InterceptedService::new(health_service, interceptor))
            .serve_with_shutdown(self.addr, signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                TurnstileError::Grpc(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grpc::PeerIpResolver;
    use std::time::Duration;
    use tonic::transport::{Channel, Endpoint};
    use tonic_health::pb::health_client::HealthClient;
    use tonic_health::pb::HealthCheckRequest;

    async fn connect(addr: SocketAddr) -> Channel {
        let endpoint = Endpoint::from_shared(format!("http://{}", addr)).unwrap();
        for _ in 0..50 {
            if let Ok(channel) = endpoint.connect().await {
                return channel;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("server at {} never accepted a connection", addr);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let rate_limiter = Arc::new(RateLimiter::with_rate(1.0, 3, PeerIpResolver).unwrap());
        let server = GrpcServer::new(addr, rate_limiter);
        assert_eq!(server.addr(), addr);
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let rate_limiter = Arc::new(RateLimiter::with_rate(1.0, 3, PeerIpResolver).unwrap());
        let server = GrpcServer::new(addr, rate_limiter);

        let result = server.serve_with_shutdown(async {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_visitors_keyed_by_peer_ip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let rate_limiter = Arc::new(RateLimiter::with_rate(0.001, 3, PeerIpResolver).unwrap());
        let server = GrpcServer::new(addr, Arc::clone(&rate_limiter));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(async {
            let _ = stop_rx.await;
        }));

        let mut client = HealthClient::new(connect(addr).await);
        let mut codes = Vec::new();
        for _ in 0..4 {
            let result = client
                .check(HealthCheckRequest {
                    service: String::new(),
                })
                .await;
            codes.push(result.err().map(|status| status.code()));
        }

        assert_eq!(
            codes,
            vec![None, None, None, Some(tonic::Code::ResourceExhausted)]
        );
        assert_eq!(rate_limiter.visitor_count(), 1);
        assert!(rate_limiter.is_tracking(&"127.0.0.1".parse().unwrap()));

        let _ = stop_tx.send(());
        assert!(handle.await.unwrap().is_ok());
    }
}
