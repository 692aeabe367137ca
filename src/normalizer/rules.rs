//! Data-driven alias tables.
//!
//! Each canonical field owns an ordered list of `(field, transform)` rules.
//! The first field that is present in the upstream record wins; its
//! transform decides whether the value is usable.

use serde_json::{Map, Value};

use crate::models::Origin;
use crate::normalizer::envelope::parse_loose;

pub type Record = Map<String, Value>;
pub type Transform<T> = fn(&Value) -> Option<T>;

pub struct Rule<T> {
    pub field: &'static str,
    pub transform: Transform<T>,
}

impl<T> Rule<T> {
    pub const fn new(field: &'static str, transform: Transform<T>) -> Self {
        Self { field, transform }
    }
}

/// `null` and empty strings count as missing.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

pub fn resolve<T>(record: &Record, rules: &[Rule<T>]) -> Option<T> {
    rules
        .iter()
        .find_map(|rule| {
            let value = record.get(rule.field);
            is_present(value).then(|| (rule, value))
        })
        .and_then(|(rule, value)| value.and_then(rule.transform))
}

/// True when any of the rules' fields is present in the record.
pub fn any_present<T>(record: &Record, rules: &[Rule<T>]) -> bool {
    rules.iter().any(|rule| is_present(record.get(rule.field)))
}

pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Arrays of strings, arrays of `{Text}`-style objects, or a comma-separated
/// string.
pub fn as_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(list_item).collect()),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
        ),
        _ => None,
    }
}

fn list_item(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["Text", "text", "name"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(String::from),
        _ => None,
    }
}

/// Objects, or strings holding a JSON object.
pub fn as_object(value: &Value) -> Option<Record> {
    match parse_loose(value)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

pub fn as_origin(value: &Value) -> Option<Origin> {
    match value {
        Value::String(s) => match s.to_lowercase().as_str() {
            "synthetic" | "test" => Some(Origin::Synthetic),
            "real" => Some(Origin::Real),
            _ => None,
        },
        Value::Bool(true) => Some(Origin::Synthetic),
        Value::Bool(false) => Some(Origin::Real),
        _ => None,
    }
}
