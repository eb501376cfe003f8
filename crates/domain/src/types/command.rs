//! Commands registered into a grouped call

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::COMMAND_ID_PREFIX;

/// Parameter map of one remote method invocation.
pub type Params = Map<String, Value>;

/// Identifier of a command within one grouped call.
///
/// Doubles as the response key and as the anchor of
/// [`ResultPath`](super::ResultPath) references from later commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    /// Identifier with an explicit name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Auto-assigned identifier for the `n`-th registered command.
    pub fn sequential(n: usize) -> Self {
        Self(format!("{COMMAND_ID_PREFIX}{n}"))
    }

    /// Identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position encoded in a sequential identifier, if this is one.
    pub fn sequence_number(&self) -> Option<usize> {
        self.0.strip_prefix(COMMAND_ID_PREFIX)?.parse().ok()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A pending remote-method invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    id: CommandId,
    method: String,
    params: Params,
}

impl Command {
    /// Command calling `method` with `params`.
    pub fn new(id: CommandId, method: impl Into<String>, params: Params) -> Self {
        Self { id, method: method.into(), params }
    }

    /// Key of this command inside its group.
    pub fn id(&self) -> &CommandId {
        &self.id
    }

    /// Remote method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Parameters sent with the call.
    pub fn params(&self) -> &Params {
        &self.params
    }
}
