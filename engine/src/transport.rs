//! The seam between a data source and the remote store.
//!
//! A [`Transport`] executes one [`Request`] and resolves with the decoded
//! response, or with a [`TransportError`]. It owns serialization, endpoint
//! resolution and failure signalling; the data source never inspects
//! transport-level status codes.

use crate::Request;
use std::future::Future;
use std::sync::Arc;

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes remote operations.
pub trait Transport {
    /// Execute a request, resolving with the response body.
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>>;
}

impl<T: Transport> Transport for &T {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> {
        (**self).execute(request)
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> {
        (**self).execute(request)
    }
}

/// A transport backed by a closure.
#[derive(Debug, Clone)]
pub struct FnTransport<F>(F);

/// Build a transport from a closure returning a future.
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(Request) -> Fut,
    Fut: Future<Output = Result<serde_json::Value, TransportError>>,
{
    FnTransport(f)
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(Request) -> Fut,
    Fut: Future<Output = Result<serde_json::Value, TransportError>>,
{
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> {
        (self.0)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Endpoint, RemoteOp};
    use serde_json::json;

    #[tokio::test]
    async fn closure_transport() {
        let transport = transport_fn(|request: Request| async move {
            Ok::<_, TransportError>(json!({"echo": request.url}))
        });

        let response = transport
            .execute(Request::new(RemoteOp::Read, &Endpoint::new("people"), json!({})))
            .await
            .unwrap();
        assert_eq!(response, json!({"echo": "people"}));
    }

    #[tokio::test]
    async fn shared_transport() {
        let transport = Arc::new(transport_fn(|_: Request| async {
            Err::<serde_json::Value, _>(TransportError::new("offline"))
        }));

        let by_ref = &transport;
        let err = by_ref
            .execute(Request::new(RemoteOp::Create, &Endpoint::new("c"), json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "offline");
    }
}
