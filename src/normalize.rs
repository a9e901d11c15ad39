//! Shape normalization for generation responses.
//!
//! The backend answers `/gen/{category}` with a one-key object whose value is
//! a single result or a list of results, and a result is either text or a
//! record of fields. [`GeneratedContent::decode`] turns that into an explicit
//! variant before anything is rendered; [`display`] then maps each result to
//! a [`DisplayBlock`].

use serde_json::{Map, Value};

/// One generated item.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Text(String),
    Record(Map<String, Value>),
    /// Anything else the backend sent. Rendered as a JSON dump.
    Other(Value),
}

impl From<Value> for GenerationResult {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => GenerationResult::Text(s),
            Value::Object(map) => GenerationResult::Record(map),
            other => GenerationResult::Other(other),
        }
    }
}

/// Decoded body of a generation response.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    SingleText(String),
    FieldRecord(Map<String, Value>),
    SequenceOf(Vec<GenerationResult>),
    /// A lone value that is neither text nor a record.
    Unexpected(Value),
}

impl GeneratedContent {
    /// Decode a success body.
    ///
    /// Only the value under the first key matters; the key itself names the
    /// collection (`npcs`, `locations`, ...) and is ignored. A body that is
    /// not an object, or an empty object, decodes to an empty sequence.
    pub fn decode(body: Value) -> Self {
        let value = match body {
            Value::Object(map) => map.into_iter().next().map(|(_, v)| v),
            other => {
                tracing::warn!(kind = kind_of(&other), "Generation body is not an object");
                None
            }
        };

        match value {
            None => GeneratedContent::SequenceOf(Vec::new()),
            Some(Value::Array(items)) => GeneratedContent::SequenceOf(
                items.into_iter().map(GenerationResult::from).collect(),
            ),
            Some(Value::String(s)) => GeneratedContent::SingleText(s),
            Some(Value::Object(map)) => GeneratedContent::FieldRecord(map),
            Some(other) => GeneratedContent::Unexpected(other),
        }
    }

    /// Always a sequence: a single result becomes a one-element list.
    pub fn into_results(self) -> Vec<GenerationResult> {
        match self {
            GeneratedContent::SingleText(s) => vec![GenerationResult::Text(s)],
            GeneratedContent::FieldRecord(map) => vec![GenerationResult::Record(map)],
            GeneratedContent::SequenceOf(items) => items,
            GeneratedContent::Unexpected(v) => vec![GenerationResult::Other(v)],
        }
    }
}

/// Shorthand for `GeneratedContent::decode(body).into_results()`.
pub fn normalize(body: Value) -> Vec<GenerationResult> {
    GeneratedContent::decode(body).into_results()
}

/// How one generated item is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayBlock {
    Text(String),
    Rows(Vec<FieldRow>),
    Dump(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    pub key: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Plain(String),
    /// Multi-line text, sent through the markup renderer.
    Markup(String),
}

impl FieldValue {
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Plain(s) | FieldValue::Markup(s) => s,
        }
    }
}

pub fn display(result: &GenerationResult) -> DisplayBlock {
    match result {
        GenerationResult::Text(s) => DisplayBlock::Text(s.clone()),
        GenerationResult::Record(map) => DisplayBlock::Rows(
            map.iter()
                .map(|(key, value)| FieldRow {
                    key: key.clone(),
                    value: field_value(value),
                })
                .collect(),
        ),
        GenerationResult::Other(value) => DisplayBlock::Dump(dump(value)),
    }
}

pub fn display_all(results: &[GenerationResult]) -> Vec<DisplayBlock> {
    results.iter().map(display).collect()
}

fn field_value(value: &Value) -> FieldValue {
    match value {
        Value::String(s) if s.contains('\n') => FieldValue::Markup(s.clone()),
        other => FieldValue::Plain(plain_text(other)),
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Lists of names, traits, etc. read best comma-joined.
        Value::Array(items) => items.iter().map(plain_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn dump(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
