//! HTTP transport backed by `ureq`.
//!
//! `ureq` is blocking, so each call runs inside
//! `tokio::task::spawn_blocking`. Relative endpoints (starting with `/`)
//! are joined to the configured base URL. Non-2xx statuses are returned
//! as responses, not errors.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::types::HttpMethod;

pub struct HttpTransport {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(base_url: Option<String>, timeout: Option<Duration>) -> Self {
        HttpTransport { base_url, timeout }
    }

    /// Join a relative endpoint to the base URL.
    ///
    /// `/orders` with base `https://api.example.com/v1/` → `https://api.example.com/v1/orders`
    pub fn resolve_url(&self, url: &str) -> String {
        match (&self.base_url, url.starts_with('/')) {
            (Some(base), true) => format!("{}{}", base.trim_end_matches('/'), url),
            _ => url.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.resolve_url(url);
        let request = request.clone();
        let timeout = self.timeout;
        let join_url = url.clone();

        tokio::task::spawn_blocking(move || blocking_send(method, &url, &request, timeout))
            .await
            .map_err(|e| TransportError::Failed {
                url: join_url,
                message: format!("task join error: {}", e),
            })?
    }
}

fn blocking_send(
    method: HttpMethod,
    url: &str,
    request: &TransportRequest,
    timeout: Option<Duration>,
) -> Result<TransportResponse, TransportError> {
    let config = ureq::Agent::config_builder()
        .timeout_global(timeout)
        .http_status_as_error(false)
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let failed = |e: ureq::Error| TransportError::Failed {
        url: url.to_string(),
        message: e.to_string(),
    };

    let response = match method {
        HttpMethod::Get | HttpMethod::Delete => {
            let mut builder = if method == HttpMethod::Get {
                agent.get(url)
            } else {
                agent.delete(url)
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call().map_err(failed)?
        }
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
            let mut builder = match method {
                HttpMethod::Post => agent.post(url),
                HttpMethod::Put => agent.put(url),
                _ => agent.patch(url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            match &request.body {
                Some(body) => builder.send_json(body).map_err(failed)?,
                None => builder.send_empty().map_err(failed)?,
            }
        }
    };

    let status = response.status().as_u16();
    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let text = response
        .into_body()
        .read_to_string()
        .map_err(|e| TransportError::InvalidBody {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    let body = if text.trim().is_empty() {
        None
    } else {
        // Non-JSON payloads are kept verbatim as a string.
        Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    };

    Ok(TransportResponse {
        status,
        headers,
        body,
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
