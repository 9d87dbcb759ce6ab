//! Named connection handle and builder factory

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::builder::{
    DeleteBuilder, InsertBuilder, InsupBuilder, IntoColumns, IntoValues, RawBuilder, SelectBuilder,
    UpdateBuilder,
};
use crate::dialect::Dialect;
use crate::executor::{ExecResult, Executor};
use crate::{Result, Value};

/// A named executor paired with its dialect.
///
/// Every builder made here uses the connection's dialect; run them with
/// the connection itself, since `Conn` is an [`Executor`].
///
/// # Examples
/// ```
/// use quarry_core::{Conn, MySql, QueryBuilder};
/// use std::sync::Arc;
///
/// let conn = Conn::new("main", Arc::new(MySql), ());
/// let mut query = conn.select(["id", "name"]);
/// query.from("users").where_in("id", [1, 2]);
/// assert_eq!(
///     query.to_sql().unwrap().sql,
///     "SELECT id, name FROM users WHERE (id in(?,?))"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Conn<E> {
    name: String,
    dialect: Arc<dyn Dialect>,
    executor: E,
}

impl<E> Conn<E> {
    pub fn new(name: impl Into<String>, dialect: Arc<dyn Dialect>, executor: E) -> Self {
        Self {
            name: name.into(),
            dialect,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Pass hand-written SQL through
    pub fn sql<V: IntoValues>(&self, text: &str, args: V) -> RawBuilder {
        let mut builder = RawBuilder::new(Arc::clone(&self.dialect));
        builder.sql(text, args);
        builder
    }

    /// Start a SELECT of `columns`
    pub fn select<C: IntoColumns>(&self, columns: C) -> SelectBuilder {
        let mut builder = SelectBuilder::new(Arc::clone(&self.dialect));
        builder.select(columns);
        builder
    }

    /// Start an UPDATE; an empty table is inferred from the record given
    /// to `model` or `record`
    pub fn update(&self, table: &str) -> UpdateBuilder {
        let mut builder = UpdateBuilder::new(Arc::clone(&self.dialect));
        builder.table(table);
        builder
    }

    pub fn insert_into(&self, table: &str) -> InsertBuilder {
        let mut builder = InsertBuilder::new(Arc::clone(&self.dialect));
        builder.table(table);
        builder
    }

    pub fn replace_into(&self, table: &str) -> InsertBuilder {
        let mut builder = InsertBuilder::replace(Arc::clone(&self.dialect));
        builder.table(table);
        builder
    }

    pub fn insert_or_update(&self, table: &str) -> InsupBuilder {
        let mut builder = InsupBuilder::new(Arc::clone(&self.dialect));
        builder.table(table);
        builder
    }

    /// `DELETE FROM table ...`
    pub fn delete_from(&self, table: &str) -> DeleteBuilder {
        let mut builder = DeleteBuilder::new(Arc::clone(&self.dialect));
        builder.from(table);
        builder
    }

    /// `DELETE column FROM ...`; the table still has to be set with `from`
    pub fn delete(&self, column: &str) -> DeleteBuilder {
        let mut builder = DeleteBuilder::new(Arc::clone(&self.dialect));
        builder.target(column);
        builder
    }
}

impl<E: Executor> Executor for Conn<E> {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.executor.execute(sql, args).await
    }

    async fn fetch_all<T>(&self, sql: &str, args: &[Value]) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.executor.fetch_all(sql, args).await
    }

    async fn fetch_one<T>(&self, sql: &str, args: &[Value]) -> Result<T>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.executor.fetch_one(sql, args).await
    }

    async fn fetch_optional<T>(&self, sql: &str, args: &[Value]) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.executor.fetch_optional(sql, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MySql, QueryBuilder};

    fn conn() -> Conn<()> {
        Conn::new("main", Arc::new(MySql), ())
    }

    #[test]
    fn test_factories_preset_target() {
        let conn = conn();
        assert_eq!(conn.name(), "main");
        assert_eq!(conn.dialect().name(), "mysql");

        let mut update = conn.update("users");
        update.set("a", 1);
        assert_eq!(update.to_sql().unwrap().sql, "UPDATE users SET a=?");

        let mut insert = conn.insert_into("users");
        insert.columns("a").values((1,));
        assert_eq!(insert.to_sql().unwrap().sql, "INSERT INTO users (a) VALUES (?)");

        let mut replace = conn.replace_into("users");
        replace.columns("a").values((1,));
        assert_eq!(replace.to_sql().unwrap().sql, "REPLACE INTO users (a) VALUES (?)");

        let mut upsert = conn.insert_or_update("users");
        upsert.columns("a").values((1,)).update("a", 2);
        assert_eq!(
            upsert.to_sql().unwrap().sql,
            "INSERT INTO users (a) VALUES (?) ON DUPLICATE KEY UPDATE a=?"
        );
    }

    #[test]
    fn test_delete_entry_points() {
        let conn = conn();

        let mut rows = conn.delete_from("users");
        rows.where_("id = ?", [1]);
        assert_eq!(rows.to_sql().unwrap().sql, "DELETE FROM users WHERE (id = ?)");

        let mut column = conn.delete("u");
        column.from("users u").where_("u.id = ?", [1]);
        assert_eq!(
            column.to_sql().unwrap().sql,
            "DELETE u FROM users u WHERE (u.id = ?)"
        );

        let mut missing = conn.delete("u");
        assert!(missing.to_sql().is_err());
    }

    #[test]
    fn test_raw_sql() {
        let mut raw = conn().sql("SELECT ? + ?", (1, 2));
        let stmt = raw.to_sql().unwrap();
        assert_eq!(stmt.sql, "SELECT ? + ?");
        assert_eq!(stmt.args.len(), 2);
    }
}
