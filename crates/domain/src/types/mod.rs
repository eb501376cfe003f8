//! Value types shared by the pagination engine and its transports

pub mod command;
pub mod method;
pub mod query;
pub mod response;
pub mod result_path;
pub mod window;
pub mod write;

pub use command::{Command, CommandId, Params};
pub use method::{ListMethod, PaginationStrategy};
pub use query::{list_params, Direction, FilterOp, FilterSpec, ListQuery, ListQueryBuilder, OrderSpec};
pub use response::{
    CommandOutcome, CommandResponse, GroupedEntry, GroupedResponse, Pagination, RemoteFailure,
};
pub use result_path::{PathSegment, ResultPath};
pub use window::PageWindow;
pub use write::{value_kind, WriteItem, WriteOutcome};
