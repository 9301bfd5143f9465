//! Condition trees shared by rule `when` clauses and flow guards.

use serde::{Deserialize, Serialize};

/// Boolean combinator for a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOp {
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotOp {
    Not,
}

/// Comparison operators available to leaf conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// True when `left` resolves to a value other than `null`. A path
    /// holding JSON `null` counts as absent.
    Exists,
    DateEq,
    DateBefore,
    DateAfter,
    DateBetween,
    Contains,
    In,
    NotIn,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Neq => "neq",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Exists => "exists",
            CompareOp::DateEq => "dateEq",
            CompareOp::DateBefore => "dateBefore",
            CompareOp::DateAfter => "dateAfter",
            CompareOp::DateBetween => "dateBetween",
            CompareOp::Contains => "contains",
            CompareOp::In => "in",
            CompareOp::NotIn => "notIn",
        }
    }
}

/// Input to a comparison: a path read at evaluation time or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Path { path: String },
    Value { value: serde_json::Value },
}

impl Operand {
    pub fn path(path: impl Into<String>) -> Self {
        Operand::Path { path: path.into() }
    }

    pub fn value(value: serde_json::Value) -> Self {
        Operand::Value { value }
    }
}

/// Recursive boolean expression.
///
/// Variants are tried in declaration order when deserializing: a node
/// whose `op` is `all`/`any` is a group, `not` is a negation, and any
/// comparison operator is a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Group {
        op: GroupOp,
        #[serde(default)]
        children: Vec<Condition>,
    },
    Not {
        op: NotOp,
        child: Box<Condition>,
    },
    Compare {
        op: CompareOp,
        left: Operand,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        right: Option<Operand>,
    },
}

impl Condition {
    pub fn all(children: Vec<Condition>) -> Self {
        Condition::Group {
            op: GroupOp::All,
            children,
        }
    }

    pub fn any(children: Vec<Condition>) -> Self {
        Condition::Group {
            op: GroupOp::Any,
            children,
        }
    }

    pub fn not(child: Condition) -> Self {
        Condition::Not {
            op: NotOp::Not,
            child: Box::new(child),
        }
    }

    pub fn compare(op: CompareOp, left: Operand, right: Operand) -> Self {
        Condition::Compare {
            op,
            left,
            right: Some(right),
        }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Condition::Compare {
            op: CompareOp::Exists,
            left: Operand::path(path),
            right: None,
        }
    }

    /// A condition that always holds, used for empty groups.
    pub fn always() -> Self {
        Condition::compare(
            CompareOp::Eq,
            Operand::value(serde_json::Value::Bool(true)),
            Operand::value(serde_json::Value::Bool(true)),
        )
    }
}
