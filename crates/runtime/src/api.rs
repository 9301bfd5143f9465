//! API orchestrator.
//!
//! Turns a declarative [`ApiMapping`] into a request, hands it to the
//! injected [`Transport`], and folds selected response fields back into
//! data. A failed call (transport error or status >= 400) is recorded in
//! the trace and leaves data untouched.

use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{info, warn};
use url::Url;

use crate::action::{scoped_path, source_path};
use crate::error::{TraceError, TraceErrorKind};
use crate::path;
use crate::trace::{ApiRequestRecord, ApiResponseRecord, ApiTrace, FieldDiff};
use crate::transport::{Transport, TransportRequest, TransportResponse};
use crate::types::{ApiMapping, DataMap, ExecutionContext};

/// Result of one API dispatch.
#[derive(Debug, Clone)]
pub struct ApiOutcome {
    pub data: DataMap,
    pub trace: ApiTrace,
}

impl ApiOutcome {
    pub fn failed(&self) -> bool {
        self.trace.error.is_some()
    }
}

/// A request assembled from a mapping, before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    pub url: String,
    pub request: TransportRequest,
}

/// Build the URL, headers and body for `mapping` from `{context, data}`.
///
/// Sources that do not resolve are left out of the request. Targets
/// outside `query.`, `headers.` and `body` are ignored.
pub fn build_request(mapping: &ApiMapping, context: &ExecutionContext, data: &DataMap) -> BuiltRequest {
    let root = path::make_root(data.clone(), context.to_json());

    let mut parts = Value::Object(Map::new());
    for field in &mapping.request_transform {
        let Some(value) = source_path(&field.from).and_then(|p| path::get(&root, &p)) else {
            continue;
        };
        if request_target(&field.to) {
            path::write(&mut parts, &field.to, value.clone());
        }
    }

    let mut target = render_endpoint(&mapping.endpoint, &root);
    if let Some(Value::Object(query)) = parts.get("query") {
        if !query.is_empty() {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in query {
                serializer.append_pair(key, &scalar_text(value));
            }
            let separator = if target.contains('?') { '&' } else { '?' };
            target = format!("{}{}{}", target, separator, serializer.finish());
        }
    }

    let headers = match parts.get("headers") {
        Some(Value::Object(h)) => h
            .iter()
            .map(|(name, value)| (name.clone(), scalar_text(value)))
            .collect(),
        _ => Default::default(),
    };

    BuiltRequest {
        url: target,
        request: TransportRequest {
            headers,
            body: parts.get("body").cloned(),
        },
    }
}

/// Call the API described by `mapping` and merge the response into data.
///
/// The caller's `data` is never modified; the outcome carries a new map.
pub async fn dispatch(
    mapping: &ApiMapping,
    context: &ExecutionContext,
    data: &DataMap,
    transport: &dyn Transport,
) -> ApiOutcome {
    let started = Instant::now();
    let built = build_request(mapping, context, data);

    let mut trace = ApiTrace {
        api_id: mapping.api_id.clone(),
        method: mapping.method,
        endpoint: built.url.clone(),
        request: ApiRequestRecord {
            headers: built
                .request
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            body: built.request.body.clone(),
        },
        response: None,
        error: None,
        diffs: Vec::new(),
        duration_ms: 0,
    };

    let mut next_data = data.clone();
    match transport.send(mapping.method, &built.url, &built.request).await {
        Ok(response) => {
            trace.response = Some(ApiResponseRecord {
                status: response.status,
                body: response.body.clone(),
            });
            if response.status >= 400 {
                warn!(api_id = %mapping.api_id, status = response.status, "api call returned error status");
                trace.error = Some(
                    TraceError::new(
                        TraceErrorKind::HttpStatus,
                        format!("{} {} returned status {}", mapping.method, built.url, response.status),
                    )
                    .with_code(Some(response.status.to_string())),
                );
            } else {
                let (merged, diffs) = apply_response(mapping, &response, data);
                next_data = merged;
                trace.diffs = diffs;
                info!(api_id = %mapping.api_id, status = response.status, "api call completed");
            }
        }
        Err(e) => {
            warn!(api_id = %mapping.api_id, error = %e, "api transport failed");
            trace.error = Some(
                TraceError::new(TraceErrorKind::Transport, e.to_string())
                    .with_code(Some(e.code().to_string())),
            );
        }
    }

    trace.duration_ms = started.elapsed().as_millis() as u64;
    ApiOutcome {
        data: next_data,
        trace,
    }
}

/// Apply `responseTransform` to a copy of `data`.
fn apply_response(
    mapping: &ApiMapping,
    response: &TransportResponse,
    data: &DataMap,
) -> (DataMap, Vec<FieldDiff>) {
    let mut response_root = Map::new();
    response_root.insert("status".to_string(), Value::from(response.status));
    response_root.insert(
        "headers".to_string(),
        Value::Object(
            response
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
    );
    response_root.insert(
        "body".to_string(),
        response.body.clone().unwrap_or(Value::Null),
    );
    let response_root = Value::Object(response_root);

    let mut root = Value::Object(Map::new());
    path::write(&mut root, "data", Value::Object(data.clone()));
    let mut diffs = Vec::new();

    for field in &mapping.response_transform {
        let value = if field.from == "body" || field.from == "status" {
            response_root.get(&field.from).cloned()
        } else {
            path::get(&response_root, &field.from).cloned()
        };
        let (Some(value), Some(target)) = (value, scoped_path("data", &field.to)) else {
            continue;
        };
        let before = path::get(&root, &target).cloned();
        if path::write(&mut root, &target, value) {
            diffs.push(FieldDiff {
                after: path::get(&root, &target).cloned(),
                path: target,
                before,
            });
        }
    }

    let merged = match root {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(d)) => d,
            _ => data.clone(),
        },
        _ => data.clone(),
    };
    (merged, diffs)
}

fn request_target(to: &str) -> bool {
    to == "body" || ["query.", "headers.", "body."].iter().any(|p| to.starts_with(p))
}

/// Substitute `{path}` placeholders with URL-encoded path segments.
fn render_endpoint(template: &str, root: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let placeholder = &rest[open + 1..open + close];
        let text = source_path(placeholder)
            .and_then(|p| path::get(root, &p))
            .map(scalar_text)
            .unwrap_or_default();
        out.push_str(&encode_segment(&text));
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn encode_segment(raw: &str) -> String {
    let Ok(mut url) = Url::parse("http://segment.invalid/") else {
        return raw.to_string();
    };
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.clear().push(raw);
        }
        Err(()) => return raw.to_string(),
    }
    url.path().trim_start_matches('/').to_string()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
