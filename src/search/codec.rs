// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field transform codec between typed records and suffix-tagged index documents.
//!
//! The index is schema-less: it infers a field's type from a suffix on its
//! name (`_s` string, `_i` integer, `_f` float, `_b` boolean, `_t` text).
//! [`encode`] appends the suffix, [`decode`] strips it and restores the value.
//!
//! `decode(encode(x)) == x` holds for every record whose values are strings,
//! booleans or numbers, with two documented exceptions:
//! - `null` fields are dropped by `encode` and are simply absent after `decode`.
//! - fields overridden as [`FieldKind::Ngram`] are write-only matchers and are
//!   dropped by `decode`.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// A typed record, as produced by serializing a model.
pub type Record = Map<String, Value>;

/// A flat, suffix-tagged index document.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "id";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CodecError {
    #[error("Field '{0}' must be a list of child records")]
    ExpectedList(String),

    #[error("Child of field '{0}' is not an object")]
    ExpectedObject(String),

    #[error("Field '{field}' does not hold a valid {expected}")]
    InvalidValue { field: String, expected: &'static str },

    #[error("Malformed document id: {0}")]
    MalformedId(String),
}

/// How a field is stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    /// Tokenized full-text field
    Text,
    /// Edge-ngram matcher duplicate of another field; never decoded
    Ngram,
    /// List of child documents (one-to-many relation)
    Nested(Box<Schema>),
}

impl FieldKind {
    /// Suffix tag without the separator; nested children keep the bare key.
    fn tag(&self) -> Option<&'static str> {
        match self {
            FieldKind::String => Some("s"),
            FieldKind::Int => Some("i"),
            FieldKind::Float => Some("f"),
            FieldKind::Bool => Some("b"),
            FieldKind::Text => Some("t"),
            FieldKind::Ngram => Some("ng"),
            FieldKind::Nested(_) => None,
        }
    }
}

/// Per-entity codec configuration, built once when the entity's index is
/// constructed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Prefix for `id` values (`"<entity>:<id>"`); `None` passes ids through.
    entity: Option<String>,
    /// Position, counted from the end, of the numeric id segment.
    id_position: usize,
    overrides: HashMap<String, FieldKind>,
}

impl Schema {
    /// Schema for a top-level entity whose ids are namespaced by `name`.
    pub fn entity(name: &str) -> Self {
        Self {
            entity: Some(name.to_lowercase()),
            ..Self::default()
        }
    }

    /// Schema for child documents, whose ids are already composite.
    pub fn child() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, kind: FieldKind) -> Self {
        self.overrides.insert(name.to_string(), kind);
        self
    }

    pub fn with_id_position(mut self, position_from_end: usize) -> Self {
        self.id_position = position_from_end;
        self
    }

    fn encode_id(&self, value: &Value) -> Value {
        match (&self.entity, value) {
            (Some(entity), Value::String(s)) => Value::String(format!("{entity}:{s}")),
            (Some(entity), Value::Number(n)) => Value::String(format!("{entity}:{n}")),
            _ => value.clone(),
        }
    }

    fn decode_id(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(raw) => parse_id(raw, self.id_position)
                .map(Value::from)
                .ok_or_else(|| CodecError::MalformedId(raw.clone())),
            other => Err(CodecError::MalformedId(other.to_string())),
        }
    }
}

/// Encode a record into an index document.
pub fn encode(record: &Record, schema: &Schema) -> Result<Document, CodecError> {
    let mut document = Document::new();

    for (key, value) in record {
        if value.is_null() {
            continue;
        }
        if key == ID_FIELD {
            document.insert(key.clone(), schema.encode_id(value));
            continue;
        }

        match schema.overrides.get(key) {
            Some(FieldKind::Nested(child_schema)) => {
                let children = value
                    .as_array()
                    .ok_or_else(|| CodecError::ExpectedList(key.clone()))?
                    .iter()
                    .map(|child| {
                        let child = child
                            .as_object()
                            .ok_or_else(|| CodecError::ExpectedObject(key.clone()))?;
                        encode(child, child_schema).map(Value::Object)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                document.insert(key.clone(), Value::Array(children));
            }
            Some(kind) => {
                let tag = kind.tag().unwrap_or("s");
                document.insert(format!("{key}_{tag}"), value.clone());
            }
            None => {
                let (tag, stored) = infer(value);
                document.insert(format!("{key}_{tag}"), stored);
            }
        }
    }

    Ok(document)
}

/// Suffix inferred from the runtime type. Anything that is not a scalar is
/// stored as its JSON text in a string field.
fn infer(value: &Value) -> (&'static str, Value) {
    match value {
        Value::String(_) => ("s", value.clone()),
        Value::Bool(_) => ("b", value.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => ("i", value.clone()),
        Value::Number(_) => ("f", value.clone()),
        other => ("s", Value::String(other.to_string())),
    }
}

/// Decode an index document back into a record.
///
/// Keys without a recognized suffix (index bookkeeping such as `_version_`)
/// are ignored.
pub fn decode(document: &Document, schema: &Schema) -> Result<Record, CodecError> {
    let mut record = Record::new();

    for (key, value) in document {
        if key == ID_FIELD {
            record.insert(key.clone(), schema.decode_id(value)?);
            continue;
        }

        if let Some(FieldKind::Nested(child_schema)) = schema.overrides.get(key) {
            let children: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                single => vec![single],
            };
            let decoded = children
                .into_iter()
                .map(|child| {
                    let child = child
                        .as_object()
                        .ok_or_else(|| CodecError::ExpectedObject(key.clone()))?;
                    decode(child, child_schema).map(Value::Object)
                })
                .collect::<Result<Vec<_>, _>>()?;
            record.insert(key.clone(), Value::Array(decoded));
            continue;
        }

        let Some((field, tag)) = key.rsplit_once('_') else {
            continue;
        };
        if field.is_empty() {
            continue;
        }
        let decoded = match tag {
            "s" | "t" => value.clone(),
            "i" => decode_int(field, value)?,
            "f" => decode_float(field, value)?,
            "b" => decode_bool(field, value)?,
            _ => continue,
        };
        record.insert(field.to_string(), decoded);
    }

    Ok(record)
}

fn decode_int(field: &str, value: &Value) -> Result<Value, CodecError> {
    let invalid = || CodecError::InvalidValue {
        field: field.to_string(),
        expected: "integer",
    };
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn decode_float(field: &str, value: &Value) -> Result<Value, CodecError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .map(Value::from)
        .ok_or_else(|| CodecError::InvalidValue {
            field: field.to_string(),
            expected: "float",
        })
}

fn decode_bool(field: &str, value: &Value) -> Result<Value, CodecError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if s == "true" => Ok(Value::Bool(true)),
        Value::String(s) if s == "false" => Ok(Value::Bool(false)),
        _ => Err(CodecError::InvalidValue {
            field: field.to_string(),
            expected: "boolean",
        }),
    }
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Extract the numeric id from a colon-separated id.
///
/// Looks at the segment `position_from_end` places from the end first; if that
/// one is not numeric, takes the right-most all-digit segment instead.
pub fn parse_id(raw: &str, position_from_end: usize) -> Option<u64> {
    let tokens: Vec<&str> = raw.split(':').collect();
    let expected = tokens
        .len()
        .checked_sub(position_from_end + 1)
        .and_then(|index| tokens.get(index))
        .filter(|token| is_digits(token));

    expected
        .or_else(|| tokens.iter().rev().find(|token| is_digits(token)))
        .and_then(|token| token.parse().ok())
}

/// Parse the trailing segment of an id as the numeric id.
#[deprecated(note = "breaks on composite child ids; use `parse_id`")]
pub fn parse_trailing_id(raw: &str) -> Option<u64> {
    raw.rsplit(':').next()?.parse().ok()
}
