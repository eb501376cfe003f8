//! Identifier extraction from loosely typed rows

use serde_json::Value;

/// Integer value of an identifier, whether sent as a number or a string.
pub fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Identifier of `row`, looking `id_field` up case-insensitively.
pub fn row_id(row: &Value, id_field: &str) -> Option<i64> {
    let map = row.as_object()?;
    let value = map.get(id_field).or_else(|| {
        map.iter().find(|(key, _)| key.eq_ignore_ascii_case(id_field)).map(|(_, value)| value)
    })?;
    parse_id(value)
}
