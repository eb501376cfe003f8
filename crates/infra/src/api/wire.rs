//! Response envelopes of the webhook REST API

use crmbatch_domain::{
    Command, CommandOutcome, CommandResponse, CrmError, GroupedEntry, GroupedResponse, Pagination,
    RemoteFailure, Result,
};
use serde_json::{Map, Value};

/// Method-level error carried in a response body, if any.
pub fn envelope_error(body: &Value) -> Option<RemoteFailure> {
    let code = body.get("error")?;
    Some(failure_from(code, body.get("error_description")))
}

fn failure_from(code: &Value, description: Option<&Value>) -> RemoteFailure {
    let code = match code {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let description = description.and_then(Value::as_str).unwrap_or_default();
    RemoteFailure::new(code, description)
}

/// Counts arrive as numbers or numeric strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

/// `time.duration` is reported in seconds.
fn duration_ms(time: Option<&Value>) -> Option<f64> {
    time?.get("duration")?.as_f64().map(|secs| secs * 1000.0)
}

/// Parse the body of a direct call.
pub fn direct_response(method: &str, body: Value) -> Result<CommandResponse> {
    if let Some(failure) = envelope_error(&body) {
        return Err(CrmError::remote(method, failure.to_string()));
    }
    let Value::Object(mut envelope) = body else {
        return Err(CrmError::Protocol(format!("{method}: response body is not an object")));
    };

    let pagination = Pagination {
        total: envelope.get("total").and_then(as_count),
        next: envelope.get("next").and_then(as_count),
    };
    let duration_ms = duration_ms(envelope.get("time"));
    let result = envelope.remove("result").unwrap_or(Value::Null);

    Ok(CommandResponse { result, pagination, duration_ms })
}

/// One keyed section of a grouped response; PHP encodes an empty one as `[]`.
fn section<'a>(inner: &'a Map<String, Value>, name: &str) -> Result<Option<&'a Map<String, Value>>> {
    match inner.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        Some(_) => Err(CrmError::Protocol(format!("batch section '{name}' is not keyed by command id"))),
    }
}

/// Parse the body of a grouped call into entries ordered like `commands`.
///
/// Commands absent from every section were skipped after a halting failure.
pub fn grouped_response(body: &Value, commands: &[Command]) -> Result<GroupedResponse> {
    if let Some(failure) = envelope_error(body) {
        return Err(CrmError::remote("batch", failure.to_string()));
    }
    let inner = body
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| CrmError::Protocol("batch response without result object".into()))?;

    let results = section(inner, "result")?;
    let errors = section(inner, "result_error")?;
    let totals = section(inner, "result_total")?;
    let nexts = section(inner, "result_next")?;
    let times = section(inner, "result_time")?;

    fn lookup<'a>(map: Option<&'a Map<String, Value>>, id: &str) -> Option<&'a Value> {
        map.and_then(|map| map.get(id))
    }

    let entries = commands
        .iter()
        .map(|command| {
            let id = command.id().as_str();
            let outcome = if let Some(error) = lookup(errors, id) {
                match error {
                    Value::Object(_) => CommandOutcome::Failed(failure_from(
                        error.get("error").unwrap_or(&Value::Null),
                        error.get("error_description"),
                    )),
                    other => CommandOutcome::Failed(failure_from(other, None)),
                }
            } else if let Some(result) = lookup(results, id) {
                CommandOutcome::Completed(CommandResponse {
                    result: result.clone(),
                    pagination: Pagination {
                        total: lookup(totals, id).and_then(as_count),
                        next: lookup(nexts, id).and_then(as_count),
                    },
                    duration_ms: duration_ms(lookup(times, id)),
                })
            } else {
                CommandOutcome::NotExecuted
            };
            GroupedEntry { command_id: command.id().clone(), outcome }
        })
        .collect();

    let mut response = GroupedResponse::new(entries);
    response.duration_ms = duration_ms(body.get("time"));
    Ok(response)
}
