//! Statement execution interface and the sqlx-backed executor

use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::builder::{QueryBuilder, Statement};
use crate::{Error, Result, Value};

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key of the last inserted row, when the driver reports one
    pub last_insert_id: Option<i64>,
}

/// Something that can run SQL with positional arguments.
///
/// Rows are handed back through serde, so `T` can be a struct deriving
/// `Deserialize` or a `serde_json::Map` for untyped access.
pub trait Executor: Send + Sync {
    /// Execute a statement that returns no rows (INSERT, UPDATE, DELETE)
    fn execute(&self, sql: &str, args: &[Value]) -> impl Future<Output = Result<ExecResult>> + Send;

    /// Execute a query that returns multiple rows
    fn fetch_all<T>(&self, sql: &str, args: &[Value]) -> impl Future<Output = Result<Vec<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin;

    /// Execute a query that returns exactly one row
    fn fetch_one<T>(&self, sql: &str, args: &[Value]) -> impl Future<Output = Result<T>> + Send
    where
        T: DeserializeOwned + Send + Unpin;

    /// Execute a query that returns at most one row
    fn fetch_optional<T>(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin;
}

/// Extension trait giving every builder its terminal execution calls.
///
/// Each call generates the statement first; a configuration error
/// captured by the builder is returned without touching the executor.
pub trait ExecutableQuery: QueryBuilder {
    /// Run the statement and report affected rows
    fn exec<E>(&mut self, executor: &E) -> impl Future<Output = Result<ExecResult>> + Send
    where
        E: Executor;

    /// Run the query and decode every row
    fn query_to<T, E>(&mut self, executor: &E) -> impl Future<Output = Result<Vec<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin,
        E: Executor;

    /// Run the query and decode the first row, if any
    fn query_next<T, E>(&mut self, executor: &E) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin,
        E: Executor;
}

impl<B> ExecutableQuery for B
where
    B: QueryBuilder + Send,
{
    async fn exec<E>(&mut self, executor: &E) -> Result<ExecResult>
    where
        E: Executor,
    {
        let stmt = self.to_sql()?;
        debug!(sql = %stmt.sql, args = %log_args(&stmt.args), "executing statement");
        executor.execute(&stmt.sql, &stmt.args).await
    }

    async fn query_to<T, E>(&mut self, executor: &E) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        E: Executor,
    {
        let stmt = self.to_sql()?;
        debug!(sql = %stmt.sql, args = %log_args(&stmt.args), "executing query");
        executor.fetch_all(&stmt.sql, &stmt.args).await
    }

    async fn query_next<T, E>(&mut self, executor: &E) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        E: Executor,
    {
        let stmt = self.to_sql()?;
        debug!(sql = %stmt.sql, args = %log_args(&stmt.args), "executing query for one row");
        executor.fetch_optional(&stmt.sql, &stmt.args).await
    }
}

/// Arguments as a JSON array for statement logs
fn log_args(args: &[Value]) -> serde_json::Value {
    serde_json::Value::Array(args.iter().map(Value::to_json).collect())
}

/// Run a count statement and read the first column of the first row.
/// No row counts as zero.
pub(crate) async fn fetch_count<E: Executor>(executor: &E, stmt: &Statement) -> Result<i64> {
    debug!(sql = %stmt.sql, args = %log_args(&stmt.args), "executing count");
    let row: Option<serde_json::Map<String, serde_json::Value>> =
        executor.fetch_optional(&stmt.sql, &stmt.args).await?;

    let Some(row) = row else {
        return Ok(0);
    };
    match row.into_iter().next().map(|(_, value)| value) {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| Error::execution(format!("count {n} is out of range"))),
        Some(serde_json::Value::String(s)) => s
            .parse()
            .map_err(|_| Error::execution(format!("count '{s}' is not a number"))),
        Some(serde_json::Value::Null) => Ok(0),
        other => Err(Error::execution(format!(
            "count query returned unexpected value {other:?}"
        ))),
    }
}

/// Executor over a sqlx `AnyPool`; the driver is picked from the URL
pub mod any {
    use super::*;
    use crate::config::PoolSettings;
    use futures::TryStreamExt;
    use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
    use sqlx::query::Query;
    use sqlx::{Any, AnyPool, Column, Row, TypeInfo, ValueRef};

    /// sqlx-backed executor
    #[derive(Debug, Clone)]
    pub struct AnyExecutor {
        pool: AnyPool,
    }

    impl AnyExecutor {
        /// Open a pool for `url` with the given settings
        pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self> {
            sqlx::any::install_default_drivers();
            let pool = AnyPoolOptions::new()
                .max_connections(settings.max_open_conns)
                .max_lifetime(settings.conn_max_lifetime)
                .acquire_timeout(settings.connect_timeout)
                .connect(url)
                .await?;
            Ok(Self { pool })
        }

        /// Wrap an existing pool
        pub fn from_pool(pool: AnyPool) -> Self {
            Self { pool }
        }

        pub fn pool(&self) -> &AnyPool {
            &self.pool
        }

        pub async fn close(&self) {
            self.pool.close().await;
        }
    }

    impl Executor for AnyExecutor {
        async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
            let result = bind_values(sqlx::query(sql), args).execute(&self.pool).await?;
            Ok(ExecResult {
                rows_affected: result.rows_affected(),
                last_insert_id: result.last_insert_id(),
            })
        }

        async fn fetch_all<T>(&self, sql: &str, args: &[Value]) -> Result<Vec<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            let mut rows = bind_values(sqlx::query(sql), args).fetch(&self.pool);
            let mut results = Vec::new();
            while let Some(row) = rows.try_next().await? {
                results.push(decode_row(&row)?);
            }
            Ok(results)
        }

        async fn fetch_one<T>(&self, sql: &str, args: &[Value]) -> Result<T>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            let row = bind_values(sqlx::query(sql), args).fetch_one(&self.pool).await?;
            decode_row(&row)
        }

        async fn fetch_optional<T>(&self, sql: &str, args: &[Value]) -> Result<Option<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            match bind_values(sqlx::query(sql), args).fetch_optional(&self.pool).await? {
                Some(row) => Ok(Some(decode_row(&row)?)),
                None => Ok(None),
            }
        }
    }

    fn bind_values<'q>(
        mut query: Query<'q, Any, AnyArguments<'q>>,
        args: &'q [Value],
    ) -> Query<'q, Any, AnyArguments<'q>> {
        for arg in args {
            query = match arg {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                // The Any driver has no JSON type; send the document as text.
                Value::Json(j) => query.bind(j.to_string()),
            };
        }
        query
    }

    fn decode_row<T: DeserializeOwned>(row: &AnyRow) -> Result<T> {
        let json = row_to_json(row)?;
        Ok(serde_json::from_value(json)?)
    }

    /// Columns in select order, decoded by the kind the driver reports.
    ///
    /// The Any driver never flags a value as null through `is_null`, so a
    /// NULL column is recognised by its `NULL` type name instead.
    fn row_to_json(row: &AnyRow) -> Result<serde_json::Value> {
        let mut object = serde_json::Map::with_capacity(row.columns().len());
        for (i, column) in row.columns().iter().enumerate() {
            let type_info = row.try_get_raw(i)?.type_info().into_owned();
            let value = match type_info.name() {
                "NULL" => serde_json::Value::Null,
                "BOOLEAN" => serde_json::Value::Bool(row.try_get::<bool, _>(i)?),
                "SMALLINT" | "INTEGER" | "BIGINT" => row.try_get::<i64, _>(i)?.into(),
                "REAL" | "DOUBLE" => row.try_get::<f64, _>(i)?.into(),
                "TEXT" => serde_json::Value::String(row.try_get::<String, _>(i)?),
                "BLOB" => row.try_get::<Vec<u8>, _>(i)?.into(),
                other => {
                    return Err(Error::execution(format!(
                        "can not decode column {} of type {other}",
                        column.name()
                    )))
                }
            };
            object.insert(column.name().to_string(), value);
        }
        Ok(serde_json::Value::Object(object))
    }

}
