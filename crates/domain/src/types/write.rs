//! Bulk write items and outcomes

use serde_json::{Map, Value};

use crate::constants::{PARAM_FIELDS, PARAM_ID};
use crate::errors::{CrmError, Result};
use crate::types::command::Params;

/// Human-readable JSON type name used in validation errors.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validated target of one write command.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteItem {
    /// Identifier of the target item.
    pub id: i64,
    /// Field values for updates; `None` for deletes.
    pub fields: Option<Map<String, Value>>,
}

impl WriteItem {
    /// Validate the identifier found at position `index` of the caller input.
    ///
    /// Only JSON integers are accepted: numeric strings and floats are caller
    /// errors, not something to coerce.
    pub fn validate_id(index: usize, raw: &Value) -> Result<i64> {
        raw.as_i64().ok_or_else(|| CrmError::InvalidArgumentKind {
            index,
            value: raw.to_string(),
            kind: value_kind(raw).to_string(),
        })
    }

    /// Delete the item `id`.
    pub fn delete(id: i64) -> Self {
        Self { id, fields: None }
    }

    /// Overwrite `fields` on the item `id`.
    pub fn update(id: i64, fields: Map<String, Value>) -> Self {
        Self { id, fields: Some(fields) }
    }

    /// Parameters of the single-item call.
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert(PARAM_ID.into(), Value::from(self.id));
        if let Some(fields) = &self.fields {
            params.insert(PARAM_FIELDS.into(), Value::Object(fields.clone()));
        }
        params
    }
}

/// Result of one applied write, tagged with its input position.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// Position of the item in the submitted list.
    pub index: usize,
    /// Identifier of the written item.
    pub id: i64,
    /// Raw result returned for the item.
    pub result: Value,
}
