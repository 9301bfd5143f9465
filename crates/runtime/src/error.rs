//! Error types.
//!
//! Two families: [`ConfigError`] is fatal and raised before a step does
//! any work; [`TraceError`] is a structured, serializable record of a
//! non-fatal failure that lands in the step's trace.

use serde::{Deserialize, Serialize};

/// A configuration bundle that upstream validation should have rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("flow '{flow_id}': initial state '{state_id}' is not defined")]
    UnknownInitialState { flow_id: String, state_id: String },

    #[error("flow '{flow_id}': state '{state_id}' is not defined")]
    UnknownState { flow_id: String, state_id: String },

    #[error("flow '{flow_id}': transition '{from}' --{event}--> '{target}' targets an undefined state")]
    UnknownTarget {
        flow_id: String,
        from: String,
        event: String,
        target: String,
    },

    #[error("flow '{flow_id}': transition '{from}' --{event}--> references unknown action '{action}'")]
    UnknownAction {
        flow_id: String,
        from: String,
        event: String,
        action: String,
    },

    #[error("flow '{flow_id}': transition '{from}' --{event}--> references unknown api '{api_id}'")]
    UnknownApi {
        flow_id: String,
        from: String,
        event: String,
        api_id: String,
    },

    #[error("rule set '{version}': duplicate rule id '{rule_id}'")]
    DuplicateRuleId { version: String, rule_id: String },

    #[error("api mapping keyed '{key}' declares apiId '{api_id}'")]
    MismatchedApiId { key: String, api_id: String },
}

/// Category of a non-fatal error recorded in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceErrorKind {
    /// A `throwError` action fired.
    RuleRaised,
    /// A `setContext` write produced a context that does not deserialize.
    InvalidContext,
    /// The transport capability failed to produce a response.
    Transport,
    /// The transport answered with a status of 400 or above.
    HttpStatus,
}

impl TraceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceErrorKind::RuleRaised => "rule_raised",
            TraceErrorKind::InvalidContext => "invalid_context",
            TraceErrorKind::Transport => "transport",
            TraceErrorKind::HttpStatus => "http_status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceError {
    pub kind: TraceErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl TraceError {
    pub fn new(kind: TraceErrorKind, message: impl Into<String>) -> Self {
        TraceError {
            kind,
            message: message.into(),
            code: None,
            rule_id: None,
        }
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_error_display() {
        let err = ConfigError::UnknownTarget {
            flow_id: "f".into(),
            from: "start".into(),
            event: "next".into(),
            target: "nowhere".into(),
        };
        assert_eq!(
            err.to_string(),
            "flow 'f': transition 'start' --next--> 'nowhere' targets an undefined state"
        );
    }

    #[test]
    fn trace_error_serializes_structured() {
        let err = TraceError::new(TraceErrorKind::RuleRaised, "blocked")
            .with_code(Some("E42".into()))
            .with_rule("r1");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "kind": "rule_raised", "message": "blocked", "code": "E42", "ruleId": "r1" })
        );
    }
}
