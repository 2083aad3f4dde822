//! Small navigation helpers over a generic `serde_json::Value` tree, each producing a typed
//! [`dagrunner_core::Error`] (rather than `Option`) so the loader can propagate a precise
//! `context` string (e.g. `"DAG.Vertices[2].Task"`) with every failure.

use dagrunner_core::{Error, Result};
use serde_json::{Map, Value};

/// Borrows `value` as a JSON object, tagging a failure with `context`.
pub fn object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::wrong_type(context, "object"))
}

/// Borrows `value` as a JSON array, tagging a failure with `context`.
pub fn array<'a>(value: &'a Value, context: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::wrong_type(context, "array"))
}

/// Fetches a required key from `object`, failing with [`Error::MissingKey`] if absent.
pub fn required<'a>(object: &'a Map<String, Value>, key: &str, context: &str) -> Result<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| Error::missing_key(key, context))
}

/// Fetches a required string-valued key.
pub fn required_str<'a>(object: &'a Map<String, Value>, key: &str, context: &str) -> Result<&'a str> {
    required(object, key, context)?
        .as_str()
        .ok_or_else(|| Error::wrong_type(format!("{context}.{key}"), "string"))
}

/// Fetches an optional string-valued key, ignoring absence and wrong-shape alike (callers
/// that need to distinguish "absent" from "wrong shape" use `object.get` directly).
pub fn optional_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// A short, human-readable description of a JSON value's shape, used in error messages.
pub fn describe_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A minimal well-formed document, quoted verbatim in `WrongRoot` error messages so a caller
/// can see the expected shape without consulting external documentation.
pub const SAMPLE_DOCUMENT: &str = r#"DAG:
  Title: example
  Vertices:
    - UUID: 11111111-1111-1111-1111-111111111111
      Name: first
      Task:
        Name: first-task
        Stages:
          - Name: print
            LibraryName: ./libexample.so
            SymbolName: print_stage_factory
  Connections:
    - From: 11111111-1111-1111-1111-111111111111
      To: 22222222-2222-2222-2222-222222222222
"#;
