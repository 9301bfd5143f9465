//! Condition tree evaluation.
//!
//! Conditions are evaluated against the `{data, context}` root. Groups
//! short-circuit: `all` stops at the first false child and `any` at the
//! first true one, so paths under skipped children are never read and
//! never show up in the read log.

use serde_json::Value;

use crate::compare;
use crate::path;
use crate::provenance::ReadCollector;
use crate::types::{Condition, GroupOp, Operand};

/// Evaluate a condition. Never fails: operands that do not resolve or
/// have the wrong shape make their comparison false.
pub fn eval_condition(cond: &Condition, root: &Value, collector: &mut ReadCollector) -> bool {
    match cond {
        Condition::Group { op, children } => {
            if children.is_empty() {
                // An empty group behaves as a single always-true leaf.
                return true;
            }
            match op {
                GroupOp::All => children
                    .iter()
                    .all(|child| eval_condition(child, root, collector)),
                GroupOp::Any => children
                    .iter()
                    .any(|child| eval_condition(child, root, collector)),
            }
        }

        Condition::Not { child, .. } => !eval_condition(child, root, collector),

        Condition::Compare { op, left, right } => {
            let left_val = resolve_operand(left, root, collector);
            let right_val = right
                .as_ref()
                .and_then(|r| resolve_operand(r, root, collector));
            compare::compare(*op, left_val, right_val)
        }
    }
}

fn resolve_operand<'a>(
    operand: &'a Operand,
    root: &'a Value,
    collector: &mut ReadCollector,
) -> Option<&'a Value> {
    match operand {
        Operand::Path { path } => {
            let value = path::get(root, path);
            collector.record(path, value);
            value
        }
        Operand::Value { value } => Some(value),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompareOp;
    use serde_json::json;

    fn root() -> Value {
        json!({
            "data": { "orderTotal": 1200, "email": "a@b.c", "flag": false },
            "context": { "country": "FR" }
        })
    }

    fn eval(cond: &Condition) -> (bool, ReadCollector) {
        let mut c = ReadCollector::new();
        let r = eval_condition(cond, &root(), &mut c);
        (r, c)
    }

    fn is_false() -> Condition {
        Condition::compare(
            CompareOp::Eq,
            Operand::path("data.flag"),
            Operand::value(json!(true)),
        )
    }

    fn is_true() -> Condition {
        Condition::compare(
            CompareOp::Eq,
            Operand::path("data.flag"),
            Operand::value(json!(false)),
        )
    }

    fn recording() -> Condition {
        Condition::exists("data.sideEffect")
    }

    #[test]
    fn compare_reads_path() {
        let cond = Condition::compare(
            CompareOp::Gt,
            Operand::path("data.orderTotal"),
            Operand::value(json!(1000)),
        );
        let (result, c) = eval(&cond);
        assert!(result);
        assert_eq!(c.reads.len(), 1);
        assert_eq!(c.reads[0].path, "data.orderTotal");
        assert_eq!(c.reads[0].value, Some(json!(1200)));
    }

    #[test]
    fn all_short_circuits_on_false() {
        let (result, c) = eval(&Condition::all(vec![is_false(), recording()]));
        assert!(!result);
        assert!(!c.has_read("data.sideEffect"));
    }

    #[test]
    fn any_short_circuits_on_true() {
        let (result, c) = eval(&Condition::any(vec![is_true(), recording()]));
        assert!(result);
        assert!(!c.has_read("data.sideEffect"));
    }

    #[test]
    fn all_evaluates_every_child_when_true() {
        let (result, c) = eval(&Condition::all(vec![is_true(), recording()]));
        assert!(!result);
        assert!(c.has_read("data.sideEffect"));
    }

    #[test]
    fn empty_groups_are_true() {
        assert!(eval(&Condition::all(vec![])).0);
        assert!(eval(&Condition::any(vec![])).0);
    }

    #[test]
    fn not_negates() {
        assert!(eval(&Condition::not(is_false())).0);
        assert!(!eval(&Condition::not(is_true())).0);
    }

    #[test]
    fn missing_path_is_recorded_as_unresolved() {
        let (result, c) = eval(&Condition::exists("data.customer.id"));
        assert!(!result);
        assert_eq!(c.reads[0].value, None);
    }

    #[test]
    fn path_operand_on_right_is_read() {
        let cond = Condition::compare(
            CompareOp::Eq,
            Operand::value(json!("FR")),
            Operand::path("context.country"),
        );
        let (result, c) = eval(&cond);
        assert!(result);
        assert!(c.has_read("context.country"));
    }

    #[test]
    fn non_date_runtime_value_is_false() {
        let cond = Condition::compare(
            CompareOp::DateBefore,
            Operand::path("data.email"),
            Operand::value(json!("2030-01-01")),
        );
        assert!(!eval(&cond).0);
    }
}
