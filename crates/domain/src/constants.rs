//! Protocol constants
//!
//! Limits and sentinel values imposed by the remote REST API.

/// Maximum number of rows a single direct list call returns.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Maximum number of commands one grouped `batch` call may carry.
pub const DEFAULT_BATCH_COMMAND_LIMIT: usize = 50;

/// Default identifier field of list methods (`crm.*.list` style).
pub const DEFAULT_ID_FIELD: &str = "ID";

/// `start` value for the first counted page.
pub const START_FIRST_PAGE: i64 = 0;

/// `start` value telling the backend to skip the total-count query.
pub const START_UNCOUNTED: i64 = -1;

/// Prefix of auto-assigned command identifiers (`cmd_0`, `cmd_1`, ...).
pub const COMMAND_ID_PREFIX: &str = "cmd_";

/// Name of the grouped-call endpoint.
pub const BATCH_METHOD: &str = "batch";

/// Sort specification of a list call.
pub const PARAM_ORDER: &str = "order";
/// Filter predicates of a list call.
pub const PARAM_FILTER: &str = "filter";
/// Fields a list call returns.
pub const PARAM_SELECT: &str = "select";
/// Offset of a list call; see [`START_FIRST_PAGE`] and [`START_UNCOUNTED`].
pub const PARAM_START: &str = "start";
/// Target of single-item `delete` and `update` calls.
pub const PARAM_ID: &str = "id";
/// Field values of an `update` call.
pub const PARAM_FIELDS: &str = "fields";

/// Cheap method used by client health checks.
pub const HEALTH_CHECK_METHOD: &str = "server.time";
