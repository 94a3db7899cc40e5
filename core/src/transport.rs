//! The network seam: one request in, one response (or failure) out.
//!
//! # Design
//! The executor and the retry decorator only ever talk to `dyn Transport`,
//! so concrete HTTP stacks, test doubles and decorators compose freely. A
//! transport reports connection-level failures as `TransportError::Network`;
//! the variant, never the message, decides how the failure is classified.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::http::{WireRequest, WireResponse};

/// Failure of a transport to produce a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established or broke down.
    #[error("network failure: {0}")]
    Network(#[source] BoxError),
    #[error("transport failure: {0}")]
    Other(#[source] BoxError),
}

impl TransportError {
    pub fn network(source: impl Into<BoxError>) -> Self {
        TransportError::Network(source.into())
    }

    pub fn other(source: impl Into<BoxError>) -> Self {
        TransportError::Other(source.into())
    }
}

/// Performs exactly one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Transport backed by an async closure. See [`transport_fn`].
#[derive(Clone)]
pub struct FnTransport<F> {
    f: F,
}

/// Build a transport from an async closure receiving an owned copy of each
/// request.
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<WireResponse, TransportError>> + Send,
{
    FnTransport { f }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<WireResponse, TransportError>> + Send,
{
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        (self.f)(request.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn request() -> WireRequest {
        WireRequest {
            url: "https://host.domain/path/a".to_string(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn closure_transport_sees_the_request() {
        let transport = transport_fn(|req: WireRequest| async move {
            Ok(WireResponse::new(200, req.url))
        });
        let response = transport.send(&request()).await.unwrap();
        assert_eq!(response.body.text().await.unwrap(), "https://host.domain/path/a");
    }

    #[tokio::test]
    async fn shared_transport_delegates() {
        let transport: Arc<dyn Transport> = Arc::new(transport_fn(|_| async {
            Err(TransportError::network("connection refused"))
        }));
        let err = transport.send(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
