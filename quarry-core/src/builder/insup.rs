//! Upsert builder: INSERT with an update list for key conflicts

use std::sync::Arc;

use serde::Serialize;

use super::common::{compile, IntoColumns, IntoValues, QueryBuilder, Stage, Statement};
use super::insert::InsertState;
use crate::buffer::BufferPool;
use crate::dialect::Dialect;
use crate::error::BuildError;
use crate::record::{map_records, reflect, reflect_many, Record};
use crate::{Result, Value};

#[derive(Debug, Clone, Default)]
pub(crate) struct InsupState {
    insert: InsertState,
    updates: Vec<(String, Value)>,
}

impl InsupState {
    fn render(&self, dialect: &dyn Dialect) -> std::result::Result<Statement, BuildError> {
        let clause = dialect.upsert_clause().ok_or_else(|| {
            BuildError::configuration(format!("{} has no upsert syntax", dialect.name()))
        })?;
        let holder = dialect.holder();

        let mut buf = BufferPool::global().get();
        let mut args = Vec::new();
        let columns = self.insert.render_into("INSERT", holder, &mut buf, &mut args)?;

        buf.push_str(clause);
        if self.updates.is_empty() {
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                buf.push_str(column);
                buf.push('=');
                buf.push_str(&dialect.incoming(column));
            }
        } else {
            for (i, (column, value)) in self.updates.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                buf.push_str(column);
                buf.push('=');
                buf.push(holder);
                args.push(value.clone());
            }
        }

        Ok(Statement::new(buf.to_text(), args))
    }
}

/// Upsert builder: an insert that updates the existing row on a key
/// conflict.
///
/// Without explicit [`InsupBuilder::update`] pairs every inserted column
/// is refreshed from the incoming row. MySQL renders
/// `ON DUPLICATE KEY UPDATE`, SQLite `ON CONFLICT DO UPDATE SET`.
///
/// # Examples
/// ```
/// use quarry_core::{InsupBuilder, MySql, QueryBuilder};
/// use std::sync::Arc;
///
/// let mut query = InsupBuilder::new(Arc::new(MySql));
/// query
///     .table("stock")
///     .columns(["sku", "qty"])
///     .values(("A-1", 5));
///
/// assert_eq!(
///     query.to_sql().unwrap().sql,
///     "INSERT INTO stock (sku, qty) VALUES (?, ?) \
///      ON DUPLICATE KEY UPDATE sku=VALUES(sku), qty=VALUES(qty)"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct InsupBuilder {
    dialect: Arc<dyn Dialect>,
    stage: Stage<InsupState>,
    compiled: Option<Statement>,
}

impl InsupBuilder {
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            stage: Stage::default(),
            compiled: None,
        }
    }

    pub fn table(&mut self, table: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.insert.table = table.to_string();
            Ok(())
        });
        self
    }

    pub fn columns<C: IntoColumns>(&mut self, columns: C) -> &mut Self {
        let columns = columns.into_columns();
        self.stage.apply(|s| {
            s.insert.columns.extend(columns);
            Ok(())
        });
        self
    }

    pub fn values<V: IntoValues>(&mut self, row: V) -> &mut Self {
        let row = row.into_values();
        self.stage.apply(|s| {
            s.insert.rows.push(row);
            Ok(())
        });
        self
    }

    pub fn model<T: Serialize + ?Sized>(&mut self, record: &T) -> &mut Self {
        self.stage.apply(|s| s.insert.add_mapping(reflect(record)?));
        self
    }

    pub fn models<T: Serialize>(&mut self, records: &[T]) -> &mut Self {
        self.stage.apply(|s| s.insert.add_mapping(reflect_many(records)?));
        self
    }

    pub fn records<R: Record>(&mut self, records: &[R]) -> &mut Self {
        self.stage.apply(|s| {
            if records.is_empty() {
                return Err(BuildError::mapping("no records to insert"));
            }
            s.insert.add_mapping(map_records(records)?)
        });
        self
    }

    /// On conflict, set `column=?` with `value`
    pub fn update<V: Into<Value>>(&mut self, column: &str, value: V) -> &mut Self {
        let value = value.into();
        self.stage.apply(|s| {
            s.updates.push((column.to_string(), value));
            Ok(())
        });
        self
    }
}

impl QueryBuilder for InsupBuilder {
    fn to_sql(&mut self) -> Result<Statement> {
        let dialect = self.dialect.as_ref();
        compile(&mut self.stage, &mut self.compiled, "upsert", |s| s.render(dialect))
    }

    fn error(&self) -> Option<&BuildError> {
        self.stage.error()
    }

    fn reset(&mut self) {
        self.stage = Stage::default();
        self.compiled = None;
    }
}
