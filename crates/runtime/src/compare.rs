//! Leaf comparison semantics.
//!
//! Numbers are compared through `rust_decimal::Decimal` so that `1` and
//! `1.0` are equal and no float rounding leaks into a decision. Floats
//! outside what `Decimal` holds exactly (very large or very small
//! magnitudes) are compared as `f64` instead. Date
//! operators accept `YYYY-MM-DD`, RFC 3339 date-times (with or without
//! offset; no offset means UTC) and numbers as epoch milliseconds.
//!
//! Every comparison is total: an operand of the wrong shape makes the
//! comparison false instead of raising an error.

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::types::CompareOp;

/// Evaluate `left <op> right`. `None` stands for an unresolved operand.
pub fn compare(op: CompareOp, left: Option<&Value>, right: Option<&Value>) -> bool {
    match op {
        CompareOp::Eq => json_eq(left, right),
        CompareOp::Neq => !json_eq(left, right),
        CompareOp::Gt => ordering(left, right) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            ordering(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => ordering(left, right) == Some(Ordering::Less),
        CompareOp::Lte => matches!(ordering(left, right), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Exists => left.is_some_and(|v| !v.is_null()),
        CompareOp::DateEq => match (left.and_then(parse_instant), right.and_then(parse_instant)) {
            (Some(l), Some(r)) => l.date() == r.date(),
            _ => false,
        },
        CompareOp::DateBefore => date_ordering(left, right) == Some(Ordering::Less),
        CompareOp::DateAfter => date_ordering(left, right) == Some(Ordering::Greater),
        CompareOp::DateBetween => date_between(left, right),
        CompareOp::Contains => contains(left, right),
        CompareOp::In => match (left, right) {
            (Some(l), Some(Value::Array(items))) => items.iter().any(|i| values_equal(l, i)),
            _ => false,
        },
        CompareOp::NotIn => match (left, right) {
            (Some(l), Some(Value::Array(items))) => !items.iter().any(|i| values_equal(l, i)),
            _ => false,
        },
    }
}

/// Equality over optional values: two missing operands are equal.
pub fn json_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(l), Some(r)) => values_equal(l, r),
        _ => false,
    }
}

/// Structural equality with numeric normalisation at every depth.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => number_ordering(l, r) == Some(Ordering::Equal),
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(k, v)| r.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => left == right,
    }
}

fn ordering(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    match (left?, right?) {
        (Value::Number(l), Value::Number(r)) => number_ordering(l, r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn contains(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (Some(Value::String(haystack)), Some(Value::String(needle))) => {
            haystack.contains(needle.as_str())
        }
        (Some(Value::Array(items)), Some(needle)) => items.iter().any(|i| values_equal(i, needle)),
        _ => false,
    }
}

fn number_ordering(left: &Number, right: &Number) -> Option<Ordering> {
    match (to_decimal(left), to_decimal(right)) {
        (Some(l), Some(r)) => Some(l.cmp(&r)),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

/// Exact decimal form of `n`, or `None` when a float does not survive
/// the conversion unchanged.
fn to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let f = n.as_f64()?;
    Decimal::try_from(f)
        .ok()
        .filter(|d| d.to_f64() == Some(f))
}

// ──────────────────────────────────────────────
// Dates
// ──────────────────────────────────────────────

/// Interpret a JSON value as an instant in UTC.
pub fn parse_instant(value: &Value) -> Option<OffsetDateTime> {
    let instant = match value {
        Value::String(s) => parse_date_string(s)?,
        Value::Number(n) => {
            let millis = match n.as_i64() {
                Some(ms) => i128::from(ms),
                None => n.as_f64().filter(|f| f.is_finite())?.trunc() as i128,
            };
            OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()?
        }
        _ => return None,
    };
    Some(instant.to_offset(UtcOffset::UTC))
}

fn parse_date_string(s: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt);
    }
    if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Some(d.midnight().assume_utc());
    }
    if let Ok(dt) = PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(dt.assume_utc());
    }
    PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

fn date_ordering(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    let l = parse_instant(left?)?;
    let r = parse_instant(right?)?;
    Some(l.cmp(&r))
}

fn date_between(left: Option<&Value>, right: Option<&Value>) -> bool {
    let Some(Value::Array(range)) = right else {
        return false;
    };
    let [start, end] = range.as_slice() else {
        return false;
    };
    match (
        left.and_then(parse_instant),
        parse_instant(start),
        parse_instant(end),
    ) {
        (Some(v), Some(s), Some(e)) => s <= v && v <= e,
        _ => false,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
