//! Collection schemas and front-matter validation.
//!
//! A schema declares the fields a collection cares about. Validation is a
//! pure function from a raw YAML mapping to [`Metadata`]: declared fields are
//! checked and typed, undeclared fields pass through untouched.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field `{field}` is not a valid {expected}")]
    TypeMismatch { field: String, expected: FieldKind },
}

/// Primitive kind of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Date,
    Bool,
    Number,
    List,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Date => "date",
            FieldKind::Bool => "bool",
            FieldKind::Number => "number",
            FieldKind::List => "list",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint for a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Named set of field constraints for one collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionSchema {
    fields: BTreeMap<String, FieldSpec>,
}

impl CollectionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Validate raw front matter against this schema
    pub fn validate(&self, raw: &Mapping) -> Result<Metadata, SchemaError> {
        validate(self, raw)
    }
}

/// A validated metadata value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Date(DateTime<FixedOffset>),
    Bool(bool),
    Number(f64),
    List(Vec<String>),
    /// Undeclared field, kept exactly as written
    Raw(Value),
}

/// Validated metadata record for one entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: BTreeMap<String, FieldValue>,
}

impl Metadata {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::String(s) => Some(s),
            FieldValue::Raw(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_date(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        match self.fields.get(name)? {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Raw(Value::String(s)) => parse_date(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Raw(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Validate raw front matter against a schema.
///
/// Declared fields are checked in name order, so the reported failure is the
/// same on every run. A `null` value counts as absent.
pub fn validate(schema: &CollectionSchema, raw: &Mapping) -> Result<Metadata, SchemaError> {
    let mut fields = BTreeMap::new();

    for (key, value) in raw {
        let Some(name) = scalar_to_string(key) else {
            tracing::debug!("Skipping non-scalar front matter key {:?}", key);
            continue;
        };
        if !schema.fields.contains_key(&name) {
            fields.insert(name, FieldValue::Raw(value.clone()));
        }
    }

    for (name, spec) in &schema.fields {
        let present = raw.get(name.as_str()).filter(|v| !v.is_null());

        let value = match (present, &spec.default) {
            (Some(value), _) => value,
            (None, Some(default)) => default,
            (None, None) if spec.required => {
                return Err(SchemaError::MissingField(name.clone()));
            }
            (None, None) => continue,
        };

        let typed = coerce(spec.kind, value).ok_or_else(|| SchemaError::TypeMismatch {
            field: name.clone(),
            expected: spec.kind,
        })?;
        fields.insert(name.clone(), typed);
    }

    Ok(Metadata { fields })
}

fn coerce(kind: FieldKind, value: &Value) -> Option<FieldValue> {
    match kind {
        FieldKind::String => scalar_to_string(value).map(FieldValue::String),
        FieldKind::Date => match value {
            Value::String(s) => parse_date(s).map(FieldValue::Date),
            _ => None,
        },
        FieldKind::Bool => value.as_bool().map(FieldValue::Bool),
        FieldKind::Number => value.as_f64().map(FieldValue::Number),
        FieldKind::List => match value {
            Value::Sequence(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::List),
            _ => None,
        },
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a calendar date (`2024-01-31`) or an RFC 3339 timestamp.
///
/// Plain dates are anchored at midnight UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset())
}
