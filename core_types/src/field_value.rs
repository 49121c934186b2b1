use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreTypeError, ItemId};

/// Value of a single entry field. Only these semantic types are accepted when creating entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
    /// Reference to an entry (lookup) by its id.
    Reference(ItemId),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "Text",
            FieldValue::Number(_) => "Number",
            FieldValue::Date(_) => "DateTime",
            FieldValue::Boolean(_) => "Boolean",
            FieldValue::Reference(_) => "Lookup",
        }
    }

    pub fn validate(&self) -> Result<(), CoreTypeError> {
        match self {
            FieldValue::Number(n) if !n.is_finite() => Err(CoreTypeError::InvalidFieldValue(
                format!("number must be finite, got {}", n),
            )),
            FieldValue::Reference(id) if *id <= 0 => Err(CoreTypeError::InvalidFieldValue(
                format!("reference id must be positive, got {}", id),
            )),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Date(date) => write!(f, "{}", date.to_rfc3339()),
            FieldValue::Boolean(b) => write!(f, "{}", if *b { "1" } else { "0" }),
            FieldValue::Reference(id) => write!(f, "{};#", id),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}
