//! Input schemas consumed by a step.
//!
//! Every type here is plain data deserialized from the camelCase JSON
//! produced by the configuration tooling. The runtime treats all of them
//! as read-only and shares them freely across sessions.

pub mod api;
pub mod condition;
pub mod context;
pub mod flow;
pub mod rule;

pub use api::{ApiMapping, FieldMapping, HttpMethod};
pub use condition::{CompareOp, Condition, GroupOp, Operand};
pub use context::{Device, ExecutionContext};
pub use flow::{FlowSchema, State, Transition};
pub use rule::{Rule, RuleAction, RuleScope, RuleSet};

/// Application data: the top-level object addressed as `data.*`.
pub type DataMap = serde_json::Map<String, serde_json::Value>;
