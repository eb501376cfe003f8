//! Bulk delete and update over grouped calls
//!
//! Every input item is validated before anything is registered, so a bad
//! identifier fails the whole operation without a single network call.
//! Valid items are sent in groups of at most the provider's command limit,
//! halting on the first failure, and their outcomes are yielded in input
//! order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crmbatch_domain::constants::PARAM_FIELDS;
use crmbatch_domain::types::value_kind;
use crmbatch_domain::{
    CommandOutcome, CrmError, PaginationConfig, Result, WriteItem, WriteOutcome,
};
use futures::stream::{self, Stream};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::batch::{CommandRegistry, ErrorMode, GroupedTransport};

/// Kind of bulk write, used in log fields and error summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Remove items.
    Delete,
    /// Overwrite fields of items.
    Update,
}

impl WriteKind {
    /// Label used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Update => "update",
        }
    }
}

/// Entry point of bulk writes.
#[derive(Clone)]
pub struct BulkWriter {
    transport: Arc<dyn GroupedTransport>,
    group_size: usize,
}

impl BulkWriter {
    /// Writer sizing its groups by `config`.
    pub fn new(transport: Arc<dyn GroupedTransport>, config: &PaginationConfig) -> Self {
        Self { transport, group_size: config.batch_command_limit.max(1) }
    }

    /// Delete every item in `ids`.
    ///
    /// # Errors
    /// [`CrmError::InvalidArgumentKind`] naming the first id that is not a
    /// JSON integer. Nothing is sent in that case.
    pub fn delete_many(&self, method: &str, ids: &[Value]) -> Result<BulkWrite> {
        let items = ids
            .iter()
            .enumerate()
            .map(|(index, raw)| WriteItem::validate_id(index, raw).map(WriteItem::delete))
            .collect::<Result<Vec<_>>>();
        self.prepare(method, WriteKind::Delete, items)
    }

    /// Apply `fields` to each `(id, item)` pair.
    ///
    /// `item` is either `{"fields": {...}}` or the field map itself.
    ///
    /// # Errors
    /// [`CrmError::InvalidArgumentKind`] for the first non-integer id or
    /// non-object item. Nothing is sent in that case.
    pub fn update_many<I>(&self, method: &str, items: I) -> Result<BulkWrite>
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, (raw_id, item))| {
                let id = WriteItem::validate_id(index, &raw_id)?;
                Ok(WriteItem::update(id, update_fields(index, item)?))
            })
            .collect::<Result<Vec<_>>>();
        self.prepare(method, WriteKind::Update, items)
    }

    fn prepare(
        &self,
        method: &str,
        kind: WriteKind,
        items: Result<Vec<WriteItem>>,
    ) -> Result<BulkWrite> {
        let items = items.map_err(|err| {
            error!(method, operation = kind.as_str(), error = ?err, "bulk_write_rejected");
            err
        })?;

        info!(method, operation = kind.as_str(), items = items.len(), "bulk_write_started");
        Ok(BulkWrite {
            transport: Arc::clone(&self.transport),
            method: method.to_string(),
            kind,
            items,
            sent: 0,
            buffer: VecDeque::new(),
            registry: CommandRegistry::new(self.group_size),
            pending_error: None,
            done: false,
            started: Instant::now(),
        })
    }
}

fn update_fields(index: usize, item: Value) -> Result<Map<String, Value>> {
    match item {
        Value::Object(mut map) => match map.remove(PARAM_FIELDS) {
            Some(Value::Object(fields)) => Ok(fields),
            Some(other) => Err(invalid_item(index, &other)),
            None => Ok(map),
        },
        other => Err(invalid_item(index, &other)),
    }
}

fn invalid_item(index: usize, value: &Value) -> CrmError {
    CrmError::InvalidArgumentKind {
        index,
        value: value.to_string(),
        kind: value_kind(value).to_string(),
    }
}

/// Pending bulk write, applied group by group as outcomes are pulled.
pub struct BulkWrite {
    transport: Arc<dyn GroupedTransport>,
    method: String,
    kind: WriteKind,
    items: Vec<WriteItem>,
    sent: usize,
    buffer: VecDeque<WriteOutcome>,
    registry: CommandRegistry,
    pending_error: Option<CrmError>,
    done: bool,
    started: Instant,
}

impl std::fmt::Debug for BulkWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkWrite")
            .field("method", &self.method)
            .field("kind", &self.kind)
            .field("items", &self.items.len())
            .field("sent", &self.sent)
            .finish_non_exhaustive()
    }
}

impl BulkWrite {
    /// Number of validated items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pull the outcome of the next item in input order.
    ///
    /// # Errors
    /// [`CrmError::BatchExecution`] wrapping the transport failure or the
    /// remote error of the first failing item. Items after it are not
    /// applied.
    pub async fn next_outcome(&mut self) -> Result<Option<WriteOutcome>> {
        loop {
            if let Some(outcome) = self.buffer.pop_front() {
                return Ok(Some(outcome));
            }
            if let Some(err) = self.pending_error.take() {
                return Err(self.fail(err));
            }
            if self.done {
                return Ok(None);
            }
            if self.sent >= self.items.len() {
                self.done = true;
                info!(
                    method = %self.method,
                    operation = self.kind.as_str(),
                    items = self.items.len(),
                    duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "bulk_write_finished"
                );
                return Ok(None);
            }

            if let Err(err) = self.send_group().await {
                return Err(self.fail(err));
            }
        }
    }

    fn fail(&mut self, err: CrmError) -> CrmError {
        self.done = true;
        error!(
            method = %self.method,
            operation = self.kind.as_str(),
            applied = self.sent,
            error = ?err,
            "bulk_write_failed"
        );
        err
    }

    /// Drive the write to completion, collecting every outcome.
    pub async fn collect_all(mut self) -> Result<Vec<WriteOutcome>> {
        let mut outcomes = Vec::with_capacity(self.items.len());
        while let Some(outcome) = self.next_outcome().await? {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Adapt into a [`Stream`] of outcomes.
    pub fn into_stream(self) -> impl Stream<Item = Result<WriteOutcome>> + Send {
        stream::try_unfold(self, |mut write| async move {
            Ok(write.next_outcome().await?.map(|outcome| (outcome, write)))
        })
    }

    async fn send_group(&mut self) -> Result<()> {
        let offset = self.sent;
        let end = (offset + self.registry.capacity()).min(self.items.len());

        self.registry.clear();
        let mut registered = Ok(());
        for item in &self.items[offset..end] {
            if let Err(err) = self.registry.register(self.method.as_str(), item.to_params(), None) {
                registered = Err(err);
                break;
            }
        }
        registered.map_err(|err| self.wrap(offset, err))?;

        debug!(method = %self.method, offset, commands = end - offset, "bulk_group_sending");
        let response = self
            .registry
            .execute(self.transport.as_ref(), ErrorMode::HaltOnError)
            .await
            .map_err(|err| self.wrap(offset, err))?;

        for (position, command) in self.registry.commands().iter().enumerate() {
            let index = offset + position;
            let item = &self.items[index];
            match response.get(command.id()) {
                Some(CommandOutcome::Completed(reply)) => {
                    self.buffer.push_back(WriteOutcome {
                        index,
                        id: item.id,
                        result: reply.result.clone(),
                    });
                    self.sent = index + 1;
                }
                Some(CommandOutcome::Failed(failure)) => {
                    let cause = CrmError::remote(self.method.as_str(), failure.to_string());
                    self.pending_error = Some(self.wrap(index, cause));
                    break;
                }
                Some(CommandOutcome::NotExecuted) | None => {
                    let cause = CrmError::remote(
                        self.method.as_str(),
                        format!("{} was not executed", command.id()),
                    );
                    self.pending_error = Some(self.wrap(index, cause));
                    break;
                }
            }
        }
        Ok(())
    }

    fn wrap(&self, index: usize, cause: CrmError) -> CrmError {
        if cause.is_validation() {
            return cause;
        }
        let id = self.items.get(index).map_or_else(String::new, |item| format!(" (id {})", item.id));
        CrmError::batch_execution(
            format!("bulk {} via {} aborted at item {index}{id}", self.kind.as_str(), self.method),
            cause,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn update_item_accepts_wrapped_or_bare_fields() {
        assert_eq!(
            update_fields(0, json!({"fields": {"TITLE": "a"}})).unwrap(),
            json!({"TITLE": "a"}).as_object().cloned().unwrap()
        );
        assert_eq!(
            update_fields(0, json!({"TITLE": "b"})).unwrap(),
            json!({"TITLE": "b"}).as_object().cloned().unwrap()
        );
    }

    #[test]
    fn update_item_must_be_an_object() {
        let err = update_fields(4, json!("TITLE=a")).unwrap_err();
        assert!(matches!(err, CrmError::InvalidArgumentKind { index: 4, .. }));

        let err = update_fields(2, json!({"fields": [1, 2]})).unwrap_err();
        assert!(matches!(err, CrmError::InvalidArgumentKind { index: 2, ref kind, .. } if kind == "array"));
    }
}
