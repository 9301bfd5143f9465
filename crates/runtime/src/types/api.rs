//! Declarative API mappings.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy the value at `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub from: String,
    pub to: String,
}

impl FieldMapping {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        FieldMapping {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// How to call one external endpoint on behalf of a transition.
///
/// `request_transform` sources are paths over `{context, data}` and
/// targets are rooted at `query.`, `headers.` or `body.`.
/// `response_transform` sources are rooted at `status` or `body.` and
/// targets are data paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMapping {
    pub api_id: String,
    pub method: HttpMethod,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_transform: Vec<FieldMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_transform: Vec<FieldMapping>,
}
