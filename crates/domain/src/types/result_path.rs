//! Result-path references between commands of one grouped call
//!
//! The provider substitutes `$result[<command>][<segment>]...` expressions in
//! a command's parameters with values taken from an earlier command's result
//! inside the same grouped call. The expression is opaque to this crate: it
//! is composed here and rendered to a string, never evaluated.

use std::fmt;

use serde_json::Value;

use super::command::CommandId;

/// One step of the path inside a referenced result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object field.
    Field(String),
    /// Array element.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "[{name}]"),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Reference to a value inside a previous command's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPath {
    command_id: CommandId,
    path: Vec<PathSegment>,
}

impl ResultPath {
    /// Path rooted at the result of `command_id`.
    pub fn new(command_id: CommandId) -> Self {
        Self { command_id, path: Vec::new() }
    }

    /// Descend into object field `name`.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.path.push(PathSegment::Field(name.into()));
        self
    }

    /// Descend into array element `index`.
    pub fn index(mut self, index: usize) -> Self {
        self.path.push(PathSegment::Index(index));
        self
    }

    /// Command whose result is referenced.
    pub fn command_id(&self) -> &CommandId {
        &self.command_id
    }

    /// Steps below the command result.
    pub fn segments(&self) -> &[PathSegment] {
        &self.path
    }

    /// Provider syntax, e.g. `$result[cmd_0][49][ID]`.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$result[{}]", self.command_id)?;
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<ResultPath> for Value {
    fn from(path: ResultPath) -> Self {
        Value::String(path.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_last_row_reference() {
        let path = ResultPath::new(CommandId::sequential(3)).index(49).field("ID");
        assert_eq!(path.render(), "$result[cmd_3][49][ID]");
    }

    #[test]
    fn renders_nested_rows_reference() {
        let path = ResultPath::new("cmd_0".into()).field("items").index(49).field("id");
        assert_eq!(Value::from(path), Value::String("$result[cmd_0][items][49][id]".into()));
    }
}
