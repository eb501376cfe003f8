//! Lazy, pull-driven traversal of one list method

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crmbatch_domain::constants::START_FIRST_PAGE;
use crmbatch_domain::{
    list_params, CrmError, ListMethod, ListQuery, PaginationConfig, PaginationStrategy, Result,
};
use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::{debug, error, info};

use super::budget::RowBudget;
use super::chained::ReferenceChain;
use super::context::{ListContext, Step};
use super::probe_range::ProbeRange;
use crate::batch::GroupedTransport;

/// Network activity of one traversal so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversalStats {
    /// First page and boundary probe.
    pub direct_calls: usize,
    /// Grouped calls issued.
    pub grouped_calls: usize,
    /// Commands carried by all grouped calls.
    pub commands: usize,
    /// Rows handed to the caller.
    pub rows_yielded: usize,
}

#[derive(Debug)]
enum Phase {
    FirstPage,
    ProbeRange(ProbeRange),
    Chained(ReferenceChain),
    Done,
}

/// Forward-only sequence of the rows of one list method.
///
/// Rows are fetched on demand: pulling a row either pops it from the page
/// buffer or triggers exactly the one call that refills it. Nothing is
/// fetched once the caller's limit has been reached. A traversal is single
/// pass; traversing again means building a new one.
pub struct Traversal {
    transport: Arc<dyn GroupedTransport>,
    ctx: ListContext,
    phase: Phase,
    buffer: VecDeque<Value>,
    pending_error: Option<CrmError>,
    budget: RowBudget,
    stats: TraversalStats,
    started: Instant,
    completed: bool,
}

impl std::fmt::Debug for Traversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traversal")
            .field("method", &self.ctx.method.name())
            .field("phase", &self.phase)
            .field("buffered", &self.buffer.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Traversal {
    /// Validate `query` against `method` and prepare a traversal.
    ///
    /// No call is made until the first row is pulled.
    ///
    /// # Errors
    /// [`CrmError::InvalidQuery`] when the query conflicts with the
    /// identifier handling of the engine, [`CrmError::Config`] for unusable
    /// page or group sizes.
    pub fn new(
        transport: Arc<dyn GroupedTransport>,
        method: ListMethod,
        query: &ListQuery,
        config: PaginationConfig,
    ) -> Result<Self> {
        config.validate()?;
        method.check_query(query)?;

        Ok(Self {
            transport,
            ctx: ListContext::new(method, query, config),
            phase: Phase::FirstPage,
            buffer: VecDeque::new(),
            pending_error: None,
            budget: RowBudget::new(query.limit),
            stats: TraversalStats::default(),
            started: Instant::now(),
            completed: false,
        })
    }

    /// Network activity so far.
    pub fn stats(&self) -> TraversalStats {
        self.stats
    }

    /// Size of the filtered collection, known once the first page arrived.
    pub fn total(&self) -> Option<usize> {
        self.budget.total()
    }

    /// Pull the next row; `Ok(None)` once the traversal is over.
    ///
    /// # Errors
    /// The failure of the call that was needed to produce this row. Rows
    /// yielded before it stay valid; the traversal is over afterwards.
    pub async fn next_row(&mut self) -> Result<Option<Value>> {
        loop {
            if self.budget.limit_reached() {
                self.finish();
                return Ok(None);
            }
            if let Some(row) = self.buffer.pop_front() {
                self.budget.record();
                self.stats.rows_yielded = self.budget.yielded();
                return Ok(Some(row));
            }
            if let Some(err) = self.pending_error.take() {
                return Err(self.fail(err));
            }
            if matches!(self.phase, Phase::Done) {
                self.finish();
                return Ok(None);
            }
            if !matches!(self.phase, Phase::FirstPage) && self.budget.total_reached() {
                self.finish();
                return Ok(None);
            }

            if let Err(err) = self.fetch().await {
                return Err(self.fail(err));
            }
        }
    }

    /// Adapt into a [`Stream`] of rows.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> + Send {
        stream::try_unfold(self, |mut traversal| async move {
            Ok(traversal.next_row().await?.map(|row| (row, traversal)))
        })
    }

    async fn fetch(&mut self) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        let phase = std::mem::replace(&mut self.phase, Phase::Done);

        let (step, next) = match phase {
            Phase::FirstPage => self.first_page(transport.as_ref()).await?,
            Phase::ProbeRange(mut state) => {
                let step = state.advance(&self.ctx, transport.as_ref(), &self.budget).await?;
                (step, Phase::ProbeRange(state))
            }
            Phase::Chained(mut state) => {
                let step = state.advance(&self.ctx, transport.as_ref(), &self.budget).await?;
                (step, Phase::Chained(state))
            }
            Phase::Done => return Ok(()),
        };

        self.stats.direct_calls += step.direct_calls;
        if step.commands > 0 {
            self.stats.grouped_calls += 1;
            self.stats.commands += step.commands;
            debug!(
                method = self.ctx.method.name(),
                commands = step.commands,
                rows = step.rows.len(),
                done = step.done,
                "group_fetched"
            );
        }

        self.buffer.extend(step.rows);
        self.pending_error = step.error;
        self.phase = if step.done { Phase::Done } else { next };
        Ok(())
    }

    async fn first_page(&mut self, transport: &dyn GroupedTransport) -> Result<(Step, Phase)> {
        let ctx = &self.ctx;
        let params = list_params(&ctx.order, &ctx.filter, &ctx.select, START_FIRST_PAGE);
        let response = transport.call(ctx.method.name(), &params).await?;

        let rows = ctx.rows_of(&response)?;
        let page_size = ctx.page_size();
        let total = response.pagination.total.and_then(|total| usize::try_from(total).ok());
        self.budget.set_total(total);

        debug!(
            method = ctx.method.name(),
            rows = rows.len(),
            total = ?total,
            strategy = %ctx.method.pagination_strategy(),
            "first_page_fetched"
        );

        let more = match total {
            Some(total) => total > page_size,
            None => rows.len() >= page_size,
        };
        let next = match rows.last() {
            Some(last) if more => {
                let edge = ctx.id_of(last)?;
                match ctx.method.pagination_strategy() {
                    PaginationStrategy::ProbeRange => Phase::ProbeRange(ProbeRange::new(edge, ctx)),
                    PaginationStrategy::ReferenceChained => {
                        Phase::Chained(ReferenceChain::new(edge, ctx))
                    }
                }
            }
            _ => Phase::Done,
        };

        let done = matches!(next, Phase::Done);
        Ok((Step { rows, done, direct_calls: 1, ..Step::default() }, next))
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        self.buffer.clear();
        if self.completed {
            return;
        }
        self.completed = true;
        info!(
            method = self.ctx.method.name(),
            rows = self.stats.rows_yielded,
            direct_calls = self.stats.direct_calls,
            grouped_calls = self.stats.grouped_calls,
            duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "traversal_completed"
        );
    }

    fn fail(&mut self, err: CrmError) -> CrmError {
        self.phase = Phase::Done;
        self.buffer.clear();
        self.completed = true;
        error!(
            method = self.ctx.method.name(),
            rows = self.stats.rows_yielded,
            error = ?err,
            "traversal_failed"
        );
        err
    }
}
