//! Per-traversal request composition shared by both strategies

use crmbatch_domain::constants::START_UNCOUNTED;
use crmbatch_domain::utils::row_id;
use crmbatch_domain::{
    list_params, CommandOutcome, CommandResponse, CrmError, FilterSpec, ListMethod, ListQuery,
    OrderSpec, PaginationConfig, Params, Result,
};
use serde_json::Value;

/// Normalized, immutable inputs of one traversal.
#[derive(Debug, Clone)]
pub(crate) struct ListContext {
    pub(crate) method: ListMethod,
    pub(crate) order: OrderSpec,
    pub(crate) filter: FilterSpec,
    pub(crate) select: Vec<String>,
    pub(crate) ascending: bool,
    pub(crate) config: PaginationConfig,
}

impl ListContext {
    /// Resolve the identifier ordering; ascending when the caller gave none.
    pub(crate) fn new(method: ListMethod, query: &ListQuery, config: PaginationConfig) -> Self {
        let order = query.order.clone().with_identifier(method.identifier());
        let ascending =
            order.direction_of(method.identifier()).map_or(true, |dir| dir.is_ascending());

        Self {
            method,
            order,
            filter: query.filter.clone(),
            select: query.select.clone(),
            ascending,
            config,
        }
    }

    pub(crate) fn page_size(&self) -> usize {
        self.config.page_size
    }

    pub(crate) fn id_field(&self) -> &str {
        self.method.identifier()
    }

    /// Parameters of a batched (uncounted) list command over `filter`.
    pub(crate) fn batched_params(&self, filter: &FilterSpec) -> Params {
        list_params(&self.order, filter, &self.select, START_UNCOUNTED)
    }

    pub(crate) fn rows_of(&self, response: &CommandResponse) -> Result<Vec<Value>> {
        response.rows(self.method.rows_key_name())
    }

    pub(crate) fn id_of(&self, row: &Value) -> Result<i64> {
        row_id(row, self.id_field()).ok_or_else(|| {
            CrmError::Protocol(format!(
                "{}: row without integer {} field: {row}",
                self.method.name(),
                self.id_field()
            ))
        })
    }

    /// Error raised for a command that did not complete.
    pub(crate) fn outcome_error(&self, command_id: &str, outcome: &CommandOutcome) -> CrmError {
        match outcome {
            CommandOutcome::Failed(failure) => {
                CrmError::remote(self.method.name(), format!("{command_id}: {failure}"))
            }
            CommandOutcome::NotExecuted => CrmError::remote(
                self.method.name(),
                format!("{command_id}: not executed by the grouped call"),
            ),
            CommandOutcome::Completed(_) => {
                CrmError::Internal(format!("{command_id} completed but was treated as failed"))
            }
        }
    }
}

/// Rows produced by one strategy step, and whether the traversal is over.
#[derive(Debug, Default)]
pub(crate) struct Step {
    pub(crate) rows: Vec<Value>,
    /// Failure met after `rows`; raised once they have been yielded.
    pub(crate) error: Option<CrmError>,
    pub(crate) done: bool,
    /// Commands sent in the grouped call, zero when none was made.
    pub(crate) commands: usize,
    pub(crate) direct_calls: usize,
}

impl Step {
    pub(crate) fn finished() -> Self {
        Self { done: true, ..Self::default() }
    }
}
