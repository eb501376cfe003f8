//! Command registry: the pending content of one grouped call

use crmbatch_domain::{Command, CommandId, CrmError, GroupedResponse, Params, Result};
use tracing::debug;

use super::ports::{ErrorMode, GroupedTransport};

/// Ordered, bounded list of commands awaiting one grouped call.
///
/// Not shared between traversals: every traversal or bulk operation owns its
/// registry and clears it before composing the next group.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<Command>,
    capacity: usize,
}

impl CommandRegistry {
    /// Empty registry holding at most `capacity` commands.
    pub fn new(capacity: usize) -> Self {
        Self { commands: Vec::with_capacity(capacity), capacity }
    }

    /// Append a command, assigning `cmd_<n>` when `command_id` is `None`.
    ///
    /// # Errors
    /// - [`CrmError::CapacityExceeded`] when the registry is full
    /// - [`CrmError::Internal`] when `command_id` is already registered
    pub fn register(
        &mut self,
        method: impl Into<String>,
        params: Params,
        command_id: Option<CommandId>,
    ) -> Result<CommandId> {
        if self.commands.len() >= self.capacity {
            return Err(CrmError::CapacityExceeded { limit: self.capacity });
        }

        let id = command_id.unwrap_or_else(|| CommandId::sequential(self.commands.len()));
        if self.commands.iter().any(|command| command.id() == &id) {
            return Err(CrmError::Internal(format!("command id {id} registered twice")));
        }

        self.commands.push(Command::new(id.clone(), method, params));
        Ok(id)
    }

    /// Drop every command and restart numbering at `cmd_0`.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Commands registered so far.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Most commands one group may carry.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Commands in registration order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Run every registered command as one grouped call.
    pub async fn execute(
        &self,
        transport: &dyn GroupedTransport,
        mode: ErrorMode,
    ) -> Result<GroupedResponse> {
        debug!(commands = self.commands.len(), ?mode, "executing grouped call");
        transport.execute(&self.commands, mode).await
    }
}
