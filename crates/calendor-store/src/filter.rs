use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// A single field condition.
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Gte(Value),
    Lte(Value),
    In(Vec<Value>),
    /// Case-insensitive substring match against a string field.
    ContainsCi(String),
}

/// A conjunction of field conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), Condition::Eq(value.into())));
        self
    }

    pub fn gte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), Condition::Gte(value.into())));
        self
    }

    pub fn lte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), Condition::Lte(value.into())));
        self
    }

    pub fn is_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push((field.into(), Condition::In(values)));
        self
    }

    pub fn contains_ci(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions
            .push((field.into(), Condition::ContainsCi(needle.into())));
        self
    }

    /// Whether the given document satisfies every condition.
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|(field, cond)| {
            let actual = doc.get(field).unwrap_or(&Value::Null);
            match cond {
                Condition::Eq(expected) => actual == expected,
                Condition::Gte(bound) => {
                    compare_values(actual, bound).is_some_and(|o| o != Ordering::Less)
                }
                Condition::Lte(bound) => {
                    compare_values(actual, bound).is_some_and(|o| o != Ordering::Greater)
                }
                Condition::In(options) => options.contains(actual),
                Condition::ContainsCi(needle) => actual
                    .as_str()
                    .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            }
        })
    }
}

/// One key of a multi-key sort.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Sort documents by the given keys, in order, stable on full ties.
pub(crate) fn sort_documents(docs: &mut [Value], keys: &[SortKey]) {
    docs.sort_by(|a, b| {
        for key in keys {
            let av = a.get(&key.field).unwrap_or(&Value::Null);
            let bv = b.get(&key.field).unwrap_or(&Value::Null);
            let ord = compare_values(av, bv).unwrap_or(Ordering::Equal);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Total-order comparison across documents' scalar values.
/// Returns `None` for incomparable types (treated as equal by sorts).
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(compare_strings(x, y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

/// Timestamps serialize with whatever sub-second precision the instant
/// carries, so mixed-precision values are not lexicographically comparable
/// ("..00.123Z" sorts after "..00.123456Z" as text). When both sides parse
/// as RFC 3339 they compare as instants; otherwise as plain strings.
fn compare_strings(x: &str, y: &str) -> Ordering {
    match (parse_timestamp(x), parse_timestamp(y)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => x.cmp(y),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
