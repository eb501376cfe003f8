//! Probe-range batching
//!
//! The identifier bounds of the collection are learned from the first page
//! and one reverse-ordered probe. The interval between them is cut into
//! page-sized identifier windows, fetched many per grouped call.

use crmbatch_domain::constants::START_FIRST_PAGE;
use crmbatch_domain::{list_params, CommandOutcome, PageWindow, Result};
use tracing::debug;

use super::budget::RowBudget;
use super::context::{ListContext, Step};
use crate::batch::{CommandRegistry, ErrorMode, GroupedTransport};

/// Sequence of disjoint windows covering the identifiers not yet fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowPlan {
    cursor: i64,
    lower: i64,
    upper: i64,
    width: i64,
    ascending: bool,
}

impl WindowPlan {
    /// Plan the windows left after a first page ending at `covered_edge`,
    /// given the identifier `opposite` found at the other end of the range.
    pub(crate) fn new(covered_edge: i64, opposite: i64, page_size: usize, ascending: bool) -> Self {
        let width = i64::try_from(page_size.max(1)).unwrap_or(i64::MAX);
        if ascending {
            Self { cursor: covered_edge, lower: covered_edge, upper: opposite, width, ascending }
        } else {
            // Descending pages walk down from just below the covered edge to
            // the smallest identifier, inclusive.
            let upper = covered_edge.saturating_sub(1);
            let lower = opposite.saturating_sub(1);
            Self { cursor: upper, lower, upper, width, ascending }
        }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        if self.upper <= self.lower {
            return true;
        }
        if self.ascending {
            self.cursor >= self.upper
        } else {
            self.cursor <= self.lower
        }
    }

    /// Windows still to be fetched, without consuming them.
    pub(crate) fn remaining(&self) -> usize {
        if self.is_exhausted() {
            return 0;
        }
        let span = if self.ascending { self.upper - self.cursor } else { self.cursor - self.lower };
        usize::try_from((span + self.width - 1) / self.width).unwrap_or(usize::MAX)
    }

    pub(crate) fn next_window(&mut self) -> Option<PageWindow> {
        if self.is_exhausted() {
            return None;
        }

        let window = if self.ascending {
            let end = self.cursor.saturating_add(self.width).min(self.upper);
            let window = PageWindow {
                start_exclusive: self.cursor,
                end_inclusive: end,
                is_last: end == self.upper,
            };
            self.cursor = end;
            window
        } else {
            let start = self.cursor.saturating_sub(self.width).max(self.lower);
            let window = PageWindow {
                start_exclusive: start,
                end_inclusive: self.cursor,
                is_last: start == self.lower,
            };
            self.cursor = start;
            window
        };
        Some(window)
    }
}

/// Strategy state between grouped calls.
#[derive(Debug)]
pub(crate) struct ProbeRange {
    covered_edge: i64,
    plan: Option<WindowPlan>,
    registry: CommandRegistry,
}

impl ProbeRange {
    pub(crate) fn new(covered_edge: i64, ctx: &ListContext) -> Self {
        Self {
            covered_edge,
            plan: None,
            registry: CommandRegistry::new(ctx.config.batch_command_limit),
        }
    }

    /// Identifier at the far end of the filtered collection.
    async fn probe(&self, ctx: &ListContext, transport: &dyn GroupedTransport) -> Result<Option<i64>> {
        let select = vec![ctx.id_field().to_string()];
        let params = list_params(&ctx.order.reversed(), &ctx.filter, &select, START_FIRST_PAGE);
        let response = transport.call(ctx.method.name(), &params).await?;

        match ctx.rows_of(&response)?.first() {
            Some(row) => ctx.id_of(row).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the next group of windows.
    pub(crate) async fn advance(
        &mut self,
        ctx: &ListContext,
        transport: &dyn GroupedTransport,
        budget: &RowBudget,
    ) -> Result<Step> {
        let mut probed = 0;
        let mut plan = match self.plan {
            Some(plan) => plan,
            None => {
                probed = 1;
                let Some(opposite) = self.probe(ctx, transport).await? else {
                    return Ok(Step { direct_calls: probed, ..Step::finished() });
                };
                let plan = WindowPlan::new(self.covered_edge, opposite, ctx.page_size(), ctx.ascending);
                debug!(
                    method = ctx.method.name(),
                    covered_edge = self.covered_edge,
                    opposite,
                    windows = plan.remaining(),
                    "probe_range_planned"
                );
                plan
            }
        };

        // Windows live in identifier space, so only a caller limit can
        // shrink a group; holes make the reported total useless for sizing.
        let per_group = ctx.config.batch_command_limit.saturating_sub(1).max(1);
        let wanted = match budget.limit_remaining() {
            Some(rows) => rows.div_ceil(ctx.page_size().max(1)).clamp(1, per_group),
            None => per_group,
        }
        .min(plan.remaining());

        self.registry.clear();
        for window in std::iter::from_fn(|| plan.next_window()).take(wanted) {
            let filter = ctx.filter.merged_with(window.predicates(ctx.id_field()));
            self.registry.register(ctx.method.name(), ctx.batched_params(&filter), None)?;
        }
        self.plan = Some(plan);

        if self.registry.is_empty() {
            return Ok(Step { direct_calls: probed, ..Step::finished() });
        }

        let commands = self.registry.len();
        let response = self.registry.execute(transport, ErrorMode::ContinueOnError).await?;

        let mut step = Step { commands, direct_calls: probed, ..Step::default() };
        for entry in response {
            match &entry.outcome {
                CommandOutcome::Completed(page) => step.rows.extend(ctx.rows_of(page)?),
                failed => {
                    step.error = Some(ctx.outcome_error(entry.command_id.as_str(), failed));
                    step.done = true;
                    break;
                }
            }
        }

        // Empty windows are holes in the identifier range, not the end of it.
        if plan.is_exhausted() {
            step.done = true;
        }
        Ok(step)
    }
}
