//! Quarry Core - dialect-aware SQL statement builders
//!
//! Builders assemble parameterized SQL and an ordered argument list.
//! Configuration errors are captured inside the builder and reported by
//! the terminal call (`to_sql`, `exec`, `query_to`, ...), so chains never
//! need `?` between steps. Records can be mapped to columns either through
//! the [`Record`] trait or by serde reflection.
//!
//! ```
//! use quarry_core::{Conn, MySql, QueryBuilder};
//! use std::sync::Arc;
//!
//! let conn = Conn::new("main", Arc::new(MySql), ());
//! let mut query = conn.select("*");
//! query.from("orders").where_("total > ?", [100]).limit_pp(3, 25);
//!
//! let stmt = query.to_sql().unwrap();
//! assert_eq!(stmt.sql, "SELECT * FROM orders WHERE (total > ?) LIMIT ? OFFSET ?");
//! assert_eq!(stmt.args.len(), 3);
//! ```

pub mod buffer;
pub mod builder;
pub mod condition;
pub mod config;
pub mod conn;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod record;
pub mod registry;
pub mod value;

// Re-export main types
pub use builder::{
    DeleteBuilder, InsertBuilder, InsupBuilder, IntoColumns, IntoValues, LockMode, QueryBuilder,
    RawBuilder, SelectBuilder, SortDirection, Statement, UpdateBuilder,
};
pub use config::PoolSettings;
pub use conn::Conn;
pub use dialect::{dialect_for_url, Dialect, MySql, Sqlite};
pub use error::{BuildError, Error, Result};
pub use executor::any::AnyExecutor;
pub use executor::{ExecResult, ExecutableQuery, Executor};
pub use record::{map_records, reflect, reflect_many, Mapping, Record};
pub use registry::Registry;
pub use value::Value;
