//! Client facade over one transport

use std::sync::Arc;

use crmbatch_domain::constants::HEALTH_CHECK_METHOD;
use crmbatch_domain::{
    CommandResponse, ListMethod, ListQuery, PaginationConfig, Params, Result,
};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::batch::GroupedTransport;
use crate::bulk::{BulkWrite, BulkWriter};
use crate::pagination::Traversal;

/// Entry point bundling a transport with the provider limits.
#[derive(Clone)]
pub struct CrmClient {
    transport: Arc<dyn GroupedTransport>,
    pagination: PaginationConfig,
    health_method: String,
}

impl CrmClient {
    /// Client over `transport` with the given provider limits.
    pub fn new(transport: Arc<dyn GroupedTransport>, pagination: PaginationConfig) -> Self {
        Self { transport, pagination, health_method: HEALTH_CHECK_METHOD.to_string() }
    }

    /// Use `method` instead of `server.time` for [`Self::health_check`].
    pub fn with_health_method(mut self, method: impl Into<String>) -> Self {
        self.health_method = method.into();
        self
    }

    /// Provider limits in use.
    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Invoke a single method directly.
    pub async fn call(&self, method: &str, params: &Params) -> Result<CommandResponse> {
        self.transport.call(method, params).await
    }

    /// Lazily enumerate every row `query` selects from `method`.
    ///
    /// # Errors
    /// Query and configuration errors are returned here, before any call.
    pub fn traverse(&self, method: ListMethod, query: &ListQuery) -> Result<Traversal> {
        Traversal::new(Arc::clone(&self.transport), method, query, self.pagination)
    }

    /// Delete every id through `method`, halting on the first failure.
    pub fn delete_many(&self, method: &str, ids: &[Value]) -> Result<BulkWrite> {
        self.writer().delete_many(method, ids)
    }

    /// Update every `(id, fields)` pair through `method`, halting on the first failure.
    pub fn update_many<I>(&self, method: &str, items: I) -> Result<BulkWrite>
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        self.writer().update_many(method, items)
    }

    /// Whether the remote API answers at all.
    #[instrument(skip(self), fields(method = %self.health_method))]
    pub async fn health_check(&self) -> bool {
        match self.transport.call(&self.health_method, &Params::new()).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "health_check_failed");
                false
            }
        }
    }

    fn writer(&self) -> BulkWriter {
        BulkWriter::new(Arc::clone(&self.transport), &self.pagination)
    }
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("pagination", &self.pagination)
            .field("health_method", &self.health_method)
            .finish_non_exhaustive()
    }
}
