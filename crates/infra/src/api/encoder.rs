//! Query-string encoding of command parameters
//!
//! Commands inside a grouped call travel as `method?query` strings. Nested
//! parameters use the bracketed form PHP backends parse natively:
//! `filter[>ID]=50&select[0]=ID&start=-1`.

use crmbatch_domain::{Command, Params};
use serde_json::Value;

/// Encode `params` as a bracketed, percent-encoded query string.
///
/// `null` values and empty containers produce no pair; booleans become `1`
/// and `0`.
pub fn encode_query(params: &Params) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten(key.clone(), value, &mut pairs);
    }

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn flatten(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((key, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => pairs.push((key, number.to_string())),
        Value::String(text) => pairs.push((key, text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{key}[{index}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                flatten(format!("{key}[{name}]"), item, pairs);
            }
        }
    }
}

/// `method?query` line of one command in a grouped call.
pub fn command_line(command: &Command) -> String {
    let query = encode_query(command.params());
    if query.is_empty() {
        command.method().to_string()
    } else {
        format!("{}?{}", command.method(), query)
    }
}
