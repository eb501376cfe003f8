//! Port interfaces for direct and grouped remote calls

use async_trait::async_trait;
use crmbatch_domain::{Command, CommandResponse, GroupedResponse, Params, Result};

/// Failure policy of one grouped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// Stop at the first failing command; later commands are not executed.
    HaltOnError,
    /// Execute every command and report failures per entry.
    ContinueOnError,
}

impl ErrorMode {
    /// Whether the server stops at the first failed command.
    pub fn halts(self) -> bool {
        matches!(self, Self::HaltOnError)
    }
}

/// Capability to invoke remote methods, one at a time or as a group.
#[async_trait]
pub trait GroupedTransport: Send + Sync {
    /// Invoke a single method.
    async fn call(&self, method: &str, params: &Params) -> Result<CommandResponse>;

    /// Execute `commands` as one physical call.
    ///
    /// Entries of the returned response follow the order of `commands`. A
    /// transport-level failure is returned as `Err`; per-command failures are
    /// reported inside the response.
    async fn execute(&self, commands: &[Command], mode: ErrorMode) -> Result<GroupedResponse>;
}
