//! Responses of direct and grouped calls

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::command::CommandId;
use crate::errors::{CrmError, Result};

/// Pagination descriptor attached to list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    /// Size of the whole filtered collection; absent for uncounted pages.
    pub total: Option<u64>,
    /// Offset of the next page, when one exists.
    pub next: Option<u64>,
}

/// Successful response of one method invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Payload under the `result` key.
    pub result: Value,
    /// Paging metadata reported with the payload.
    #[serde(default)]
    pub pagination: Pagination,
    /// Server-side processing time, when reported.
    pub duration_ms: Option<f64>,
}

impl CommandResponse {
    /// Response carrying `result` and no metadata.
    pub fn new(result: Value) -> Self {
        Self { result, ..Self::default() }
    }

    /// Attach pagination metadata.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Rows of a list result, optionally nested under `rows_key`.
    ///
    /// A `null` or missing result is an empty page. Objects keyed by position
    /// (how some backends encode sparse arrays) yield their values in order.
    pub fn rows(&self, rows_key: Option<&str>) -> Result<Vec<Value>> {
        let container = match rows_key {
            Some(key) => match &self.result {
                Value::Object(map) => map.get(key).unwrap_or(&Value::Null),
                Value::Null => &Value::Null,
                Value::Array(items) if items.is_empty() => &Value::Null,
                other => {
                    return Err(CrmError::Protocol(format!(
                        "expected an object holding '{key}', got {}",
                        super::write::value_kind(other)
                    )))
                }
            },
            None => &self.result,
        };

        match container {
            Value::Array(items) => Ok(items.clone()),
            Value::Object(map) => Ok(map.values().cloned().collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(CrmError::Protocol(format!(
                "expected a list of rows, got {}",
                super::write::value_kind(other)
            ))),
        }
    }
}

/// Error reported by the backend for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    /// Machine-readable error code, e.g. `ACCESS_DENIED`.
    pub code: String,
    /// Human-readable error text.
    pub description: String,
}

impl RemoteFailure {
    /// Failure with the given code and text.
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self { code: code.into(), description: description.into() }
    }
}

impl std::fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            f.write_str(&self.code)
        } else {
            write!(f, "{}: {}", self.code, self.description)
        }
    }
}

/// What happened to one command of a grouped call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// The command ran and returned a result.
    Completed(CommandResponse),
    /// The command ran and the server reported an error.
    Failed(RemoteFailure),
    /// Skipped because an earlier command failed in halt-on-error mode.
    NotExecuted,
}

/// One keyed entry of a [`GroupedResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedEntry {
    /// Command this entry answers.
    pub command_id: CommandId,
    /// What happened to the command.
    pub outcome: CommandOutcome,
}

/// Result of one grouped call, in command registration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupedResponse {
    entries: Vec<GroupedEntry>,
    pub duration_ms: Option<f64>,
}

impl GroupedResponse {
    /// Response from entries already in registration order.
    pub fn new(entries: Vec<GroupedEntry>) -> Self {
        Self { entries, duration_ms: None }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group held no command.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome of `command_id`, if it was part of the group.
    pub fn get(&self, command_id: &CommandId) -> Option<&CommandOutcome> {
        self.entries.iter().find(|entry| &entry.command_id == command_id).map(|entry| &entry.outcome)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupedEntry> {
        self.entries.iter()
    }

    /// First failed command, if any.
    pub fn first_failure(&self) -> Option<(&CommandId, &RemoteFailure)> {
        self.entries.iter().find_map(|entry| match &entry.outcome {
            CommandOutcome::Failed(failure) => Some((&entry.command_id, failure)),
            _ => None,
        })
    }
}

impl IntoIterator for GroupedResponse {
    type Item = GroupedEntry;
    type IntoIter = std::vec::IntoIter<GroupedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
