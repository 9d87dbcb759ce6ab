//! Statement builders

pub mod common;
pub mod delete;
pub mod insert;
pub mod insup;
pub mod raw;
pub mod select;
pub mod update;

pub use common::{IntoColumns, IntoValues, QueryBuilder, SortDirection, Statement};
pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use insup::InsupBuilder;
pub use raw::RawBuilder;
pub use select::{LockMode, SelectBuilder, DEFAULT_COUNT_EXPR};
pub use update::UpdateBuilder;
