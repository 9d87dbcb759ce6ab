//! DELETE query builder module

use std::sync::Arc;

use super::common::{compile, order_term, IntoValues, QueryBuilder, SortDirection, Stage, Statement};
use crate::buffer::BufferPool;
use crate::condition::{render_list, Condition, Conditions};
use crate::dialect::Dialect;
use crate::error::BuildError;
use crate::{Result, Value};

#[derive(Debug, Clone, Default)]
pub(crate) struct DeleteState {
    target: Option<String>,
    table: String,
    wheres: Conditions,
    order_bys: Vec<String>,
    limit: Option<i64>,
}

impl DeleteState {
    fn render(&self, holder: char) -> std::result::Result<Statement, BuildError> {
        if self.table.is_empty() {
            return Err(BuildError::configuration("DELETE requires a table, call from()"));
        }

        let mut buf = BufferPool::global().get();
        let mut args = Vec::new();

        buf.push_str("DELETE ");
        if let Some(target) = &self.target {
            buf.push_str(target);
            buf.push(' ');
        }
        buf.push_str("FROM ");
        buf.push_str(&self.table);

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

/// DELETE query builder
///
/// # Examples
/// ```
/// use quarry_core::{DeleteBuilder, MySql, QueryBuilder};
/// use std::sync::Arc;
///
/// let mut query = DeleteBuilder::new(Arc::new(MySql));
/// query.from("sessions").where_("expires_at < ?", ["2024-01-01"]).limit(500);
///
/// let stmt = query.to_sql().unwrap();
/// assert_eq!(stmt.sql, "DELETE FROM sessions WHERE (expires_at < ?) LIMIT ?");
/// ```
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    dialect: Arc<dyn Dialect>,
    stage: Stage<DeleteState>,
    compiled: Option<Statement>,
}

impl DeleteBuilder {
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            stage: Stage::default(),
            compiled: None,
        }
    }

    /// Table to delete from
    pub fn from(&mut self, table: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.table = table.to_string();
            Ok(())
        });
        self
    }

    /// Name what is deleted, as in `DELETE t1 FROM t1 JOIN t2 ...`
    pub fn target(&mut self, target: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.target = Some(target.to_string());
            Ok(())
        });
        self
    }

    pub fn where_<V: IntoValues>(&mut self, condition: &str, values: V) -> &mut Self {
        let holder = self.dialect.holder();
        let values = values.into_values();
        self.stage.apply(|s| {
            s.wheres.push(Condition::new(condition, values, holder)?);
            Ok(())
        });
        self
    }

    pub fn where_in<V: IntoValues>(&mut self, column: &str, values: V) -> &mut Self {
        let holder = self.dialect.holder();
        let values = values.into_values();
        self.stage.apply(|s| {
            s.wheres.push(Condition::in_list(column, values, false, holder)?);
            Ok(())
        });
        self
    }

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

impl QueryBuilder for DeleteBuilder {
    fn to_sql(&mut self) -> Result<Statement> {
        let holder = self.dialect.holder();
        compile(&mut self.stage, &mut self.compiled, "delete", |s| s.render(holder))
    }

    fn error(&self) -> Option<&BuildError> {
        self.stage.error()
    }

    fn reset(&mut self) {
        self.stage = Stage::default();
        self.compiled = None;
    }
}
