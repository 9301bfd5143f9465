//! `waypoint.toml` loading.
//!
//! The file only configures the transport the `step` command injects:
//! canned stub responses for fixture replays, or a real HTTP client.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use waypoint_runtime::transport::stub::StubTransport;
use waypoint_runtime::transport::{Transport, TransportResponse};
use waypoint_runtime::types::HttpMethod;

/// Config file picked up from the working directory when `--config` is
/// not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "waypoint.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CliConfig {
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TransportMode {
    #[default]
    Stub,
    Http,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TransportConfig {
    #[serde(default)]
    pub mode: TransportMode,
    /// Per-request timeout for `http` mode.
    pub timeout_secs: Option<u64>,
    /// Prefix for endpoints that start with `/` in `http` mode.
    pub base_url: Option<String>,
    #[serde(default)]
    pub responses: Vec<StubResponse>,
}

/// One canned response for `stub` mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StubResponse {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body as JSON text.
    pub body: Option<String>,
}

fn default_status() -> u16 {
    200
}

impl CliConfig {
    /// Load the config at `path`, or `waypoint.toml` if it exists, or the
    /// defaults (stub transport with no routes).
    pub(crate) fn load(path: Option<&Path>) -> Result<CliConfig, String> {
        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(CliConfig::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
        CliConfig::parse(&text)
            .map_err(|e| format!("invalid config '{}': {}", path.display(), e))
    }

    pub(crate) fn parse(text: &str) -> Result<CliConfig, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Build the transport this config describes.
    pub(crate) fn build_transport(&self) -> Result<Box<dyn Transport>, String> {
        match self.transport.mode {
            TransportMode::Stub => Ok(Box::new(self.stub_transport()?)),
            TransportMode::Http => self.http_transport(),
        }
    }

    fn stub_transport(&self) -> Result<StubTransport, String> {
        let mut stub = StubTransport::new();
        for response in &self.transport.responses {
            let body = match &response.body {
                Some(text) => Some(serde_json::from_str(text).map_err(|e| {
                    format!(
                        "stub response for {} {}: body is not JSON: {}",
                        response.method, response.url, e
                    )
                })?),
                None => None,
            };
            stub = stub.with_response(
                response.method,
                &response.url,
                TransportResponse {
                    status: response.status,
                    headers: response.headers.clone(),
                    body,
                },
            );
        }
        Ok(stub)
    }

    #[cfg(feature = "http")]
    fn http_transport(&self) -> Result<Box<dyn Transport>, String> {
        use waypoint_runtime::transport::http::HttpTransport;
        Ok(Box::new(HttpTransport::new(
            self.transport.base_url.clone(),
            self.transport.timeout_secs.map(std::time::Duration::from_secs),
        )))
    }

    #[cfg(not(feature = "http"))]
    fn http_transport(&self) -> Result<Box<dyn Transport>, String> {
        Err("transport mode 'http' requires the `http` feature".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_stub() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config.transport.mode, TransportMode::Stub);
        assert!(config.transport.responses.is_empty());
    }

    #[test]
    fn parses_stub_responses() {
        let config = CliConfig::parse(
            r#"
[transport]
mode = "stub"

[[transport.responses]]
method = "POST"
url = "/orders"
status = 201
body = '{"id": "o-1"}'

[[transport.responses]]
method = "GET"
url = "/ping"
"#,
        )
        .unwrap();
        let responses = &config.transport.responses;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].method, HttpMethod::Post);
        assert_eq!(responses[0].status, 201);
        assert_eq!(responses[1].status, 200);
        assert!(config.stub_transport().is_ok());
    }

    #[test]
    fn parses_http_mode() {
        let config = CliConfig::parse(
            r#"
[transport]
mode = "http"
timeout_secs = 5
base_url = "https://api.example.com"
"#,
        )
        .unwrap();
        assert_eq!(config.transport.mode, TransportMode::Http);
        assert_eq!(config.transport.timeout_secs, Some(5));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(CliConfig::parse("[transport]\nretries = 3\n").is_err());
    }

    #[test]
    fn rejects_non_json_body() {
        let config = CliConfig::parse(
            r#"
[[transport.responses]]
method = "GET"
url = "/x"
body = "not json"
"#,
        )
        .unwrap();
        let err = config.stub_transport().unwrap_err();
        assert!(err.contains("body is not JSON"), "{}", err);
    }
}
