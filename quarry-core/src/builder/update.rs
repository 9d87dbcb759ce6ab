//! UPDATE query builder module

use std::sync::Arc;

use serde::Serialize;

use super::common::{
    compile, order_term, IntoColumns, IntoValues, QueryBuilder, SortDirection, Stage, Statement,
};
use crate::buffer::BufferPool;
use crate::condition::{render_list, Condition, Conditions};
use crate::dialect::Dialect;
use crate::error::BuildError;
use crate::record::{map_records, reflect, Mapping, Record};
use crate::{Result, Value};

#[derive(Debug, Clone, Default)]
pub(crate) struct UpdateState {
    table: String,
    sets: Vec<(String, Value)>,
    columns: Vec<String>,
    source: Option<Mapping>,
    wheres: Conditions,
    order_bys: Vec<String>,
    limit: Option<i64>,
}

impl UpdateState {
    /// Explicit `set` pairs followed by the record's columns, narrowed to
    /// `columns` when those were given
    fn assignments(&self) -> std::result::Result<(String, Vec<(String, Value)>), BuildError> {
        let mut table = self.table.clone();
        let mut sets = self.sets.clone();

        if let Some(source) = &self.source {
            let mapping = if self.columns.is_empty() {
                source.clone()
            } else {
                source.project(&self.columns)?
            };
            if table.is_empty() {
                table = mapping.table;
            }
            if let Some(row) = mapping.rows.into_iter().next() {
                sets.extend(mapping.columns.into_iter().zip(row));
            }
        }

        Ok((table, sets))
    }

    fn render(&self, holder: char) -> std::result::Result<Statement, BuildError> {
        let (table, sets) = self.assignments()?;
        if table.is_empty() {
            return Err(BuildError::configuration("UPDATE requires a table"));
        }
        if sets.is_empty() {
            return Err(BuildError::configuration("UPDATE requires at least one column to set"));
        }

        let mut buf = BufferPool::global().get();
        let mut args = Vec::with_capacity(sets.len());

        buf.push_str("UPDATE ");
        buf.push_str(&table);
        buf.push_str(" SET ");
        for (i, (column, value)) in sets.into_iter().enumerate() {
            if i > 0 {
                buf.push_str(", ");
            }
            buf.push_str(&column);
            buf.push('=');
            buf.push(holder);
            args.push(value);
        }

        self.wheres.render("WHERE", &mut buf, &mut args);
        render_list("ORDER BY", &self.order_bys, &mut buf);
        if let Some(limit) = self.limit {
            buf.push_str(" LIMIT ");
            buf.push(holder);
            args.push(Value::I64(limit));
        }

        Ok(Statement::new(buf.to_text(), args))
    }
}

/// UPDATE query builder
///
/// # Examples
/// ```
/// use quarry_core::{MySql, QueryBuilder, UpdateBuilder};
/// use std::sync::Arc;
///
/// let mut query = UpdateBuilder::new(Arc::new(MySql));
/// query
///     .table("users")
///     .set("name", "Jane")
///     .set("age", 25)
///     .where_("id = ?", [7]);
///
/// let stmt = query.to_sql().unwrap();
/// assert_eq!(stmt.sql, "UPDATE users SET name=?, age=? WHERE (id = ?)");
/// ```
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    dialect: Arc<dyn Dialect>,
    stage: Stage<UpdateState>,
    compiled: Option<Statement>,
}

impl UpdateBuilder {
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            stage: Stage::default(),
            compiled: None,
        }
    }

    /// Set the target table
    pub fn table(&mut self, table: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.table = table.to_string();
            Ok(())
        });
        self
    }

    /// Assign `column=?` with `value`
    pub fn set<V: Into<Value>>(&mut self, column: &str, value: V) -> &mut Self {
        let value = value.into();
        self.stage.apply(|s| {
            s.sets.push((column.to_string(), value));
            Ok(())
        });
        self
    }

    /// Restrict and order the columns taken from a record
    pub fn columns<C: IntoColumns>(&mut self, columns: C) -> &mut Self {
        let columns = columns.into_columns();
        self.stage.apply(|s| {
            s.columns.extend(columns);
            Ok(())
        });
        self
    }

    /// Take the SET list from a serializable record
    pub fn model<T: Serialize + ?Sized>(&mut self, record: &T) -> &mut Self {
        self.stage.apply(|s| {
            s.source = Some(reflect(record)?);
            Ok(())
        });
        self
    }

    /// Take the SET list from a [`Record`]
    pub fn record<R: Record>(&mut self, record: &R) -> &mut Self {
        self.stage.apply(|s| {
            s.source = Some(map_records(std::slice::from_ref(record))?);
            Ok(())
        });
        self
    }

    /// Add a WHERE condition
    pub fn where_<V: IntoValues>(&mut self, condition: &str, values: V) -> &mut Self {
        let holder = self.dialect.holder();
        let values = values.into_values();
        self.stage.apply(|s| {
            s.wheres.push(Condition::new(condition, values, holder)?);
            Ok(())
        });
        self
    }

    /// Add a `column in(?,...)` condition
    pub fn where_in<V: IntoValues>(&mut self, column: &str, values: V) -> &mut Self {
        let holder = self.dialect.holder();
        let values = values.into_values();
        self.stage.apply(|s| {
            s.wheres.push(Condition::in_list(column, values, false, holder)?);
            Ok(())
        });
        self
    }

    /// Add a `column not in(?,...)` condition
    pub fn where_not_in<V: IntoValues>(&mut self, column: &str, values: V) -> &mut Self {
        let holder = self.dialect.holder();
        let values = values.into_values();
        self.stage.apply(|s| {
            s.wheres.push(Condition::in_list(column, values, true, holder)?);
            Ok(())
        });
        self
    }

    pub fn order_by(&mut self, order: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.order_bys.push(order.to_string());
            Ok(())
        });
        self
    }

    pub fn order_by_asc(&mut self, column: &str) -> &mut Self {
        self.order_by(&order_term(column, SortDirection::Asc))
    }

    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by(&order_term(column, SortDirection::Desc))
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.stage.apply(|s| {
            s.limit = Some(limit);
            Ok(())
        });
        self
    }
}

impl QueryBuilder for UpdateBuilder {
    fn to_sql(&mut self) -> Result<Statement> {
        let holder = self.dialect.holder();
        compile(&mut self.stage, &mut self.compiled, "update", |s| s.render(holder))
    }

    fn error(&self) -> Option<&BuildError> {
        self.stage.error()
    }

    fn reset(&mut self) {
        self.stage = Stage::default();
        self.compiled = None;
    }
}
