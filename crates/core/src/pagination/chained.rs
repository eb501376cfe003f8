//! Reference-chained batching
//!
//! Every command after the first filters on the last identifier of the
//! previous command's page, expressed as a result-path reference the
//! provider resolves inside the grouped call. One grouped call therefore
//! fetches a run of consecutive pages without knowing their bounds upfront.

use crmbatch_domain::{CommandId, CommandOutcome, FilterOp, ResultPath, Result};
use serde_json::Value;
use tracing::debug;

use super::budget::RowBudget;
use super::context::{ListContext, Step};
use crate::batch::{CommandRegistry, ErrorMode, GroupedTransport};

/// Strategy state between grouped calls.
#[derive(Debug)]
pub(crate) struct ReferenceChain {
    last_id: i64,
    registry: CommandRegistry,
}

impl ReferenceChain {
    /// Continue after the row with identifier `last_id`.
    pub(crate) fn new(last_id: i64, ctx: &ListContext) -> Self {
        Self { last_id, registry: CommandRegistry::new(ctx.config.batch_command_limit) }
    }

    fn cursor_op(ctx: &ListContext) -> FilterOp {
        if ctx.ascending {
            FilterOp::Gt
        } else {
            FilterOp::Lt
        }
    }

    /// Reference to the identifier of the last row of a full page returned
    /// by `previous`.
    pub(crate) fn last_row_reference(ctx: &ListContext, previous: CommandId) -> ResultPath {
        let path = ResultPath::new(previous);
        let path = match ctx.method.rows_key_name() {
            Some(key) => path.field(key),
            None => path,
        };
        path.index(ctx.page_size().saturating_sub(1)).field(ctx.id_field())
    }

    fn register_group(&mut self, ctx: &ListContext, commands: usize) -> Result<()> {
        let key = Self::cursor_op(ctx).key(ctx.id_field());

        self.registry.clear();
        let mut previous: Option<CommandId> = None;
        for _ in 0..commands {
            // The head of the group resumes from a concrete identifier so the
            // rows already yielded are never requested again.
            let cursor = match previous {
                Some(prev) => Value::from(Self::last_row_reference(ctx, prev)),
                None => Value::from(self.last_id),
            };
            let filter = ctx.filter.merged_with([(key.clone(), cursor)]);
            let id = self.registry.register(ctx.method.name(), ctx.batched_params(&filter), None)?;
            previous = Some(id);
        }
        Ok(())
    }

    /// Fetch the next run of chained pages.
    pub(crate) async fn advance(
        &mut self,
        ctx: &ListContext,
        transport: &dyn GroupedTransport,
        budget: &RowBudget,
    ) -> Result<Step> {
        let wanted = budget.pages_wanted(ctx.page_size(), ctx.config.batch_command_limit);
        self.register_group(ctx, wanted)?;

        let commands = self.registry.len();
        let response = self.registry.execute(transport, ErrorMode::ContinueOnError).await?;

        let mut step = Step { commands, ..Step::default() };
        for entry in response {
            let page = match &entry.outcome {
                CommandOutcome::Completed(page) => ctx.rows_of(page)?,
                failed => {
                    step.error = Some(ctx.outcome_error(entry.command_id.as_str(), failed));
                    step.done = true;
                    break;
                }
            };

            // An empty page ends the collection; a short page leaves the
            // reference of the next command pointing past its last row.
            let Some(last) = page.last() else {
                debug!(method = ctx.method.name(), command = %entry.command_id, "chain_stopped_on_empty_page");
                step.done = true;
                break;
            };
            self.last_id = ctx.id_of(last)?;
            let short = page.len() < ctx.page_size();
            step.rows.extend(page);
            if short {
                step.done = true;
                break;
            }
        }

        Ok(step)
    }
}
