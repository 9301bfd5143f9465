//! Stub transport: canned responses keyed by method and URL.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::types::HttpMethod;

/// A request the stub received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub request: TransportRequest,
}

/// Transport that answers from a fixed table and never touches the
/// network.
///
/// Routes are keyed by `"<METHOD> <url>"` with the exact URL the
/// orchestrator built, query string included. Every call is recorded so
/// that tests can assert on what was sent.
#[derive(Debug, Default)]
pub struct StubTransport {
    routes: BTreeMap<String, Result<TransportResponse, TransportError>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(method: HttpMethod, url: &str) -> String {
        format!("{} {}", method, url)
    }

    /// Answer `method url` with `response`.
    pub fn with_response(
        mut self,
        method: HttpMethod,
        url: &str,
        response: TransportResponse,
    ) -> Self {
        self.routes.insert(Self::key(method, url), Ok(response));
        self
    }

    /// Fail `method url` with `error`.
    pub fn with_error(mut self, method: HttpMethod, url: &str, error: TransportError) -> Self {
        self.routes.insert(Self::key(method, url), Err(error));
        self
    }

    /// Requests received so far, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let call = RecordedCall {
            method,
            url: url.to_string(),
            request: request.clone(),
        };
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }

        self.routes
            .get(&Self::key(method, url))
            .cloned()
            .unwrap_or_else(|| {
                Err(TransportError::NoRoute {
                    method: method.to_string(),
                    url: url.to_string(),
                })
            })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_configured_response() {
        let stub = StubTransport::new().with_response(
            HttpMethod::Get,
            "/ping",
            TransportResponse::json(200, json!({ "ok": true })),
        );
        let resp = stub
            .send(HttpMethod::Get, "/ping", &TransportRequest::default())
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, Some(json!({ "ok": true })));
    }

    #[tokio::test]
    async fn method_is_part_of_the_route() {
        let stub = StubTransport::new().with_response(
            HttpMethod::Get,
            "/ping",
            TransportResponse::json(200, json!(null)),
        );
        let err = stub
            .send(HttpMethod::Post, "/ping", &TransportRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "no_route");
    }

    #[tokio::test]
    async fn configured_error_is_returned() {
        let stub = StubTransport::new().with_error(
            HttpMethod::Post,
            "/orders",
            TransportError::Failed {
                url: "/orders".into(),
                message: "connection reset".into(),
            },
        );
        let err = stub
            .send(HttpMethod::Post, "/orders", &TransportRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Failed { .. }));
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let stub = StubTransport::new();
        let mut request = TransportRequest::default();
        request.headers.insert("X-Tenant".into(), "t1".into());
        let _ = stub.send(HttpMethod::Get, "/a", &request).await;
        let _ = stub.send(HttpMethod::Delete, "/b", &TransportRequest::default()).await;

        let calls = stub.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].url, "/a");
        assert_eq!(calls[0].request.headers["X-Tenant"], "t1");
        assert_eq!(calls[1].method, HttpMethod::Delete);
    }
}
