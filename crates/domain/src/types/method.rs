//! List method descriptors

use crate::constants::DEFAULT_ID_FIELD;
use crate::errors::{CrmError, Result};
use crate::impl_wire_enum_conversions;
use crate::types::query::ListQuery;

/// How a list method is paged beyond its first page.
///
/// Nothing in a response tells which strategy is safe for a method, so the
/// choice is made explicitly per method family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationStrategy {
    /// Probe both identifier boundaries, then fetch page-sized id windows.
    ProbeRange,
    /// Chain each command's filter to the previous command's last identifier.
    #[default]
    ReferenceChained,
}

impl_wire_enum_conversions!(PaginationStrategy {
    ProbeRange => "probe_range",
    ReferenceChained => "reference_chained",
});

/// A remote list method and the facts the engine needs to page it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMethod {
    name: String,
    id_field: String,
    rows_key: Option<String>,
    strategy: PaginationStrategy,
}

impl ListMethod {
    /// Method whose result is a flat array of rows keyed by `ID`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            rows_key: None,
            strategy: PaginationStrategy::default(),
        }
    }

    /// Use `field` as the identifier instead of `ID`.
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Rows are nested under `key` in the result (`{"items": [...]}`).
    pub fn rows_key(mut self, key: impl Into<String>) -> Self {
        self.rows_key = Some(key.into());
        self
    }

    /// Choose the batching strategy.
    pub fn strategy(mut self, strategy: PaginationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Remote method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier field rows are ordered and cut by.
    pub fn identifier(&self) -> &str {
        &self.id_field
    }

    /// Key holding the rows inside `result`, if nested.
    pub fn rows_key_name(&self) -> Option<&str> {
        self.rows_key.as_deref()
    }

    /// Batching strategy for this method.
    pub fn pagination_strategy(&self) -> PaginationStrategy {
        self.strategy
    }

    /// Reject queries whose identifier handling conflicts with the engine.
    ///
    /// Both strategies read the identifier of returned rows, own the
    /// identifier predicate of every batched command and rely on the
    /// identifier being the primary sort key.
    pub fn check_query(&self, query: &ListQuery) -> Result<()> {
        if let Some((leading, _)) = query.order.iter().next() {
            if !leading.eq_ignore_ascii_case(&self.id_field) {
                return Err(CrmError::InvalidQuery(format!(
                    "{}: cursor pagination cuts pages by identifier, so ordering must lead with {} (got {leading}); sort other fields after it or on the caller side",
                    self.name, self.id_field
                )));
            }
        }
        if !query.selects(&self.id_field) {
            return Err(CrmError::InvalidQuery(format!(
                "{}: select must include identifier field {}",
                self.name, self.id_field
            )));
        }
        if query.filter.constrains(&self.id_field) {
            return Err(CrmError::InvalidQuery(format!(
                "{}: filter must not constrain identifier field {}; the pager owns that predicate",
                self.name, self.id_field
            )));
        }
        Ok(())
    }
}
