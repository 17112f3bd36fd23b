//! Conversion between JSON and codec values.

use greatwire_format::{Reply, Value};
use serde_json::{Map, Number, Value as Json};

use crate::exit::{CliError, CliResult};

/// Parse a `--args` JSON array into codec arguments.
pub fn parse_args(input: Option<&str>) -> CliResult<Vec<Value>> {
    let Some(input) = input else {
        return Ok(Vec::new());
    };
    let json: Json = match serde_json::from_str(input) {
        Ok(json) => json,
        Err(err) => return Err(CliError::usage(format!("--args is not valid JSON: {err}"))),
    };
    match json {
        Json::Array(items) => items.iter().map(from_json).collect(),
        other => Ok(vec![from_json(&other)?]),
    }
}

/// Convert one JSON value. Arrays become lists; objects and null are rejected.
pub fn from_json(json: &Json) -> CliResult<Value> {
    match json {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => number(n),
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Array(items) => Ok(Value::List(
            items.iter().map(from_json).collect::<CliResult<_>>()?,
        )),
        Json::Null => Err(CliError::usage("null is not a valid argument")),
        Json::Object(_) => Err(CliError::usage("objects are not valid arguments")),
    }
}

fn number(n: &Number) -> CliResult<Value> {
    if let Some(v) = n.as_u64() {
        Ok(Value::UInt(v))
    } else if let Some(v) = n.as_i64() {
        Ok(Value::Int(v))
    } else {
        n.as_f64()
            .map(Value::Float)
            .ok_or_else(|| CliError::usage(format!("unsupported number {n}")))
    }
}

pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Int(v) => Json::from(*v),
        Value::UInt(v) => Json::from(*v),
        Value::Float(v) => Number::from_f64(*v).map(Json::Number).unwrap_or(Json::Null),
        Value::Bool(v) => Json::Bool(*v),
        Value::Char(c) => Json::String(char::from(*c).to_string()),
        Value::Str(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
        Value::Tuple(items) | Value::List(items) => {
            Json::Array(items.iter().map(to_json).collect())
        }
    }
}

pub fn reply_to_json(reply: &Reply) -> Json {
    match reply {
        Reply::Single(value) => to_json(value),
        Reply::Multiple(values) => Json::Array(values.iter().map(to_json).collect()),
    }
}

/// Pair each result with its parameter name, falling back to its position.
pub fn named_results(reply: &Reply, names: Option<&[String]>) -> Json {
    let mut map = Map::new();
    for (index, value) in reply_values(reply).iter().enumerate() {
        map.insert(result_name(names, index), to_json(value));
    }
    Json::Object(map)
}

pub fn reply_values(reply: &Reply) -> &[Value] {
    match reply {
        Reply::Single(value) => std::slice::from_ref(value),
        Reply::Multiple(values) => values,
    }
}

pub fn result_name(names: Option<&[String]>, index: usize) -> String {
    names
        .and_then(|names| names.get(index))
        .filter(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("result{}", index + 1))
}

/// Plain-text rendering used by the table and pretty formats.
pub fn display(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Char(c) => char::from(*c).to_string(),
        Value::Str(s) => s.clone(),
        Value::Bytes(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
        Value::Tuple(items) => {
            let inner: Vec<_> = items.iter().map(display).collect();
            format!("({})", inner.join(", "))
        }
        Value::List(items) => {
            let inner: Vec<_> = items.iter().map(display).collect();
            format!("[{}]", inner.join(", "))
        }
    }
}
