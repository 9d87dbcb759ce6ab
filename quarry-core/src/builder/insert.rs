//! INSERT and REPLACE query builders

use std::sync::Arc;

use serde::Serialize;

use super::common::{compile, IntoColumns, IntoValues, QueryBuilder, Stage, Statement};
use crate::buffer::BufferPool;
use crate::dialect::Dialect;
use crate::error::BuildError;
use crate::record::{map_records, reflect, reflect_many, Mapping, Record};
use crate::{Result, Value};

/// Insert target and rows, shared with the upsert builder
#[derive(Debug, Clone, Default)]
pub(crate) struct InsertState {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Value>>,
    pub(crate) source: Option<Mapping>,
}

impl InsertState {
    /// Merge records into the pending source; all records must agree on
    /// their columns.
    pub(crate) fn add_mapping(&mut self, mapping: Mapping) -> std::result::Result<(), BuildError> {
        match &mut self.source {
            None => self.source = Some(mapping),
            Some(existing) => {
                if existing.columns != mapping.columns {
                    return Err(BuildError::mapping(format!(
                        "records have columns {:?}, expected {:?}",
                        mapping.columns, existing.columns
                    )));
                }
                existing.rows.extend(mapping.rows);
            }
        }
        Ok(())
    }

    /// Resolve table, columns and rows, applying explicit columns to any
    /// record source.
    fn resolve(&self) -> std::result::Result<(String, Vec<String>, Vec<Vec<Value>>), BuildError> {
        let mut table = self.table.clone();
        let mut columns = self.columns.clone();
        let mut rows = self.rows.clone();

        if let Some(source) = &self.source {
            let mapping = if columns.is_empty() {
                source.clone()
            } else {
                source.project(&columns)?
            };
            if table.is_empty() {
                table = mapping.table;
            }
            columns = mapping.columns;
            rows.extend(mapping.rows);
        }

        if table.is_empty() {
            return Err(BuildError::configuration("INSERT requires a table"));
        }
        if columns.is_empty() {
            return Err(BuildError::configuration("INSERT requires at least one column"));
        }
        if rows.is_empty() {
            return Err(BuildError::configuration("INSERT requires at least one row of values"));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(BuildError::configuration(format!(
                "row {i} has {} values for {} columns",
                row.len(),
                columns.len()
            )));
        }

        Ok((table, columns, rows))
    }

    /// Write `VERB INTO t (a, b) VALUES (?, ?), (?, ?)`; returns the
    /// resolved column list.
    pub(crate) fn render_into(
        &self,
        verb: &str,
        holder: char,
        sql: &mut String,
        args: &mut Vec<Value>,
    ) -> std::result::Result<Vec<String>, BuildError> {
        let (table, columns, rows) = self.resolve()?;

        sql.push_str(verb);
        sql.push_str(" INTO ");
        sql.push_str(&table);
        sql.push_str(" (");
        sql.push_str(&columns.join(", "));
        sql.push_str(") VALUES ");

        args.reserve(rows.len() * columns.len());
        for (i, row) in rows.into_iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for j in 0..row.len() {
                if j > 0 {
                    sql.push_str(", ");
                }
                sql.push(holder);
            }
            sql.push(')');
            args.extend(row);
        }

        Ok(columns)
    }
}

/// INSERT (or REPLACE) query builder
///
/// # Examples
/// ```
/// use quarry_core::{InsertBuilder, MySql, QueryBuilder};
/// use std::sync::Arc;
///
/// let mut query = InsertBuilder::new(Arc::new(MySql));
/// query
///     .table("users")
///     .columns(["name", "age"])
///     .values(("John", 30))
///     .values(("Jane", 25));
///
/// let stmt = query.to_sql().unwrap();
/// assert_eq!(stmt.sql, "INSERT INTO users (name, age) VALUES (?, ?), (?, ?)");
/// assert_eq!(stmt.args.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    dialect: Arc<dyn Dialect>,
    replace: bool,
    stage: Stage<InsertState>,
    compiled: Option<Statement>,
}

impl InsertBuilder {
    /// Create an INSERT builder
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            replace: false,
            stage: Stage::default(),
            compiled: None,
        }
    }

    /// Create a REPLACE builder
    pub fn replace(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            replace: true,
            ..Self::new(dialect)
        }
    }

    pub fn is_replace(&self) -> bool {
        self.replace
    }

    /// Set the target table
    pub fn table(&mut self, table: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.table = table.to_string();
            Ok(())
        });
        self
    }

    /// Columns to insert; with records these filter and order the record columns
    pub fn columns<C: IntoColumns>(&mut self, columns: C) -> &mut Self {
        let columns = columns.into_columns();
        self.stage.apply(|s| {
            s.columns.extend(columns);
            Ok(())
        });
        self
    }

    /// Append one row of values, aligned with the columns
    pub fn values<V: IntoValues>(&mut self, row: V) -> &mut Self {
        let row = row.into_values();
        self.stage.apply(|s| {
            s.rows.push(row);
            Ok(())
        });
        self
    }

    /// Append a row taken from a serializable record
    pub fn model<T: Serialize + ?Sized>(&mut self, record: &T) -> &mut Self {
        self.stage.apply(|s| s.add_mapping(reflect(record)?));
        self
    }

    /// Append rows taken from a slice of serializable records
    pub fn models<T: Serialize>(&mut self, records: &[T]) -> &mut Self {
        self.stage.apply(|s| s.add_mapping(reflect_many(records)?));
        self
    }

    /// Append rows taken from [`Record`] values
    pub fn records<R: Record>(&mut self, records: &[R]) -> &mut Self {
        self.stage.apply(|s| {
            if records.is_empty() {
                return Err(BuildError::mapping("no records to insert"));
            }
            s.add_mapping(map_records(records)?)
        });
        self
    }
}

impl QueryBuilder for InsertBuilder {
    fn to_sql(&mut self) -> Result<Statement> {
        let holder = self.dialect.holder();
        let (kind, verb) = if self.replace {
            ("replace", "REPLACE")
        } else {
            ("insert", "INSERT")
        };
        compile(&mut self.stage, &mut self.compiled, kind, |s| {
            let mut buf = BufferPool::global().get();
            let mut args = Vec::new();
            s.render_into(verb, holder, &mut buf, &mut args)?;
            Ok(Statement::new(buf.to_text(), args))
        })
    }

    fn error(&self) -> Option<&BuildError> {
        self.stage.error()
    }

    fn reset(&mut self) {
        self.stage = Stage::default();
        self.compiled = None;
    }
}
