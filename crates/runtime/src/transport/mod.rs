//! Transport capability used by the API orchestrator.
//!
//! The runtime never opens a socket. Callers inject a [`Transport`] and
//! the orchestrator hands it fully built requests. Timeouts, retries and
//! authentication are the transport's business.
//!
//! Two implementations ship with the crate:
//! - [`stub::StubTransport`] replays canned responses; deterministic
//!   tests and fixture replays use it.
//! - [`http::HttpTransport`] (feature `http`) performs real calls with
//!   `ureq`.

#[cfg(feature = "http")]
pub mod http;
pub mod stub;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::HttpMethod;

/// Request handed to a transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Response produced by a transport. Any status is a response; the
/// orchestrator decides what counts as failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl TransportResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        TransportResponse {
            status,
            headers: BTreeMap::new(),
            body: Some(body),
        }
    }
}

/// The transport could not produce a response at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No stubbed response for this method and URL.
    #[error("no route for {method} {url}")]
    NoRoute { method: String, url: String },

    /// Connection, TLS, timeout or protocol failure.
    #[error("request to {url} failed: {message}")]
    Failed { url: String, message: String },

    /// The response body could not be decoded.
    #[error("invalid response body from {url}: {message}")]
    InvalidBody { url: String, message: String },
}

impl TransportError {
    /// Short machine-readable code for traces.
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::NoRoute { .. } => "no_route",
            TransportError::Failed { .. } => "failed",
            TransportError::InvalidBody { .. } => "invalid_body",
        }
    }
}

/// Performs one request on behalf of the orchestrator.
///
/// This is the only suspension point of an orchestration step.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError>;
}
