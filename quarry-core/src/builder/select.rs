//! SELECT query builder implementation

use std::sync::Arc;

use super::common::{
    compile, order_term, IntoColumns, IntoValues, QueryBuilder, SortDirection, Stage, Statement,
};
use crate::buffer::BufferPool;
use crate::condition::{render_list, Condition, Conditions};
use crate::dialect::Dialect;
use crate::error::BuildError;
use crate::executor::{fetch_count, Executor};
use crate::{Result, Value};

/// Expression used by the count helpers when none is given
pub const DEFAULT_COUNT_EXPR: &str = "count(0)";

/// Row lock requested by a SELECT; the dialect supplies the clause
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockMode {
    #[default]
    None,
    /// Shared lock, `LOCK IN SHARE MODE` on MySQL
    Share,
    /// Exclusive lock, `FOR UPDATE` on MySQL
    Update,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SelectState {
    distinct: bool,
    columns: Vec<String>,
    from: String,
    wheres: Conditions,
    group_bys: Vec<String>,
    havings: Conditions,
    order_bys: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    lock: LockMode,
}

/// What goes between `SELECT` and `FROM`
enum Projection<'a> {
    Columns,
    Expr(&'a str),
}

fn lock_clause(
    dialect: &dyn Dialect,
    mode: LockMode,
) -> std::result::Result<&'static str, BuildError> {
    dialect.lock_clause(mode).ok_or_else(|| {
        BuildError::configuration(format!("{} has no {mode:?} row lock", dialect.name()))
    })
}

impl SelectState {
    fn require_from(&self) -> std::result::Result<(), BuildError> {
        if self.from.is_empty() {
            return Err(BuildError::configuration("SELECT requires a table, call from()"));
        }
        Ok(())
    }

    fn require_columns(&self) -> std::result::Result<(), BuildError> {
        if self.columns.is_empty() {
            return Err(BuildError::configuration("SELECT requires at least one column"));
        }
        Ok(())
    }

    /// `SELECT <projection> FROM t[ WHERE][ GROUP BY][ HAVING]`
    fn render_core(&self, projection: Projection<'_>, sql: &mut String, args: &mut Vec<Value>) {
        sql.push_str("SELECT ");
        match projection {
            Projection::Columns => {
                if self.distinct {
                    sql.push_str("DISTINCT ");
                }
                sql.push_str(&self.columns.join(", "));
            }
            Projection::Expr(expr) => sql.push_str(expr),
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.from);

        self.wheres.render("WHERE", sql, args);
        render_list("GROUP BY", &self.group_bys, sql);
        self.havings.render("HAVING", sql, args);
    }

    /// `[ ORDER BY][ LIMIT ?][ OFFSET ?][ lock]`
    fn render_tail(
        &self,
        dialect: &dyn Dialect,
        sql: &mut String,
        args: &mut Vec<Value>,
    ) -> std::result::Result<(), BuildError> {
        let holder = dialect.holder();
        render_list("ORDER BY", &self.order_bys, sql);
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push(holder);
            args.push(Value::I64(limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(" OFFSET ");
            sql.push(holder);
            args.push(Value::I64(offset));
        }
        sql.push_str(lock_clause(dialect, self.lock)?);
        Ok(())
    }

    fn render(&self, dialect: &dyn Dialect) -> std::result::Result<Statement, BuildError> {
        self.require_columns()?;
        self.require_from()?;

        let mut buf = BufferPool::global().get();
        let mut args = Vec::new();
        self.render_core(Projection::Columns, &mut buf, &mut args);
        self.render_tail(dialect, &mut buf, &mut args)?;
        Ok(Statement::new(buf.to_text(), args))
    }

    fn render_count(&self, expr: &str) -> std::result::Result<Statement, BuildError> {
        self.require_from()?;

        let mut buf = BufferPool::global().get();
        let mut args = Vec::new();
        self.render_core(Projection::Expr(expr), &mut buf, &mut args);
        Ok(Statement::new(buf.to_text(), args))
    }

    fn render_count_result(
        &self,
        alias: &str,
        expr: &str,
    ) -> std::result::Result<Statement, BuildError> {
        self.require_columns()?;
        self.require_from()?;

        let mut buf = BufferPool::global().get();
        let mut args = Vec::new();
        buf.push_str("SELECT ");
        buf.push_str(expr);
        buf.push_str(" FROM( ");
        self.render_core(Projection::Columns, &mut buf, &mut args);
        buf.push(')');
        buf.push_str(alias);
        Ok(Statement::new(buf.to_text(), args))
    }
}

/// SELECT query builder
///
/// # Examples
/// ```
/// use quarry_core::{MySql, QueryBuilder, SelectBuilder};
/// use std::sync::Arc;
///
/// let mut query = SelectBuilder::new(Arc::new(MySql));
/// query
///     .select(["id", "name"])
///     .from("users")
///     .where_("age > ?", [18])
///     .order_by("id DESC")
///     .limit(10);
///
/// let stmt = query.to_sql().unwrap();
/// assert_eq!(
///     stmt.sql,
///     "SELECT id, name FROM users WHERE (age > ?) ORDER BY id DESC LIMIT ?"
/// );
/// assert_eq!(stmt.args.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    dialect: Arc<dyn Dialect>,
    stage: Stage<SelectState>,
    compiled: Option<Statement>,
}

impl SelectBuilder {
    /// Create an empty SELECT builder for a dialect
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            stage: Stage::default(),
            compiled: None,
        }
    }

    /// Add columns to select
    pub fn select<C: IntoColumns>(&mut self, columns: C) -> &mut Self {
        let columns = columns.into_columns();
        self.stage.apply(|s| {
            s.columns.extend(columns);
            Ok(())
        });
        self
    }

    /// Mark the query as DISTINCT
    pub fn distinct(&mut self) -> &mut Self {
        self.stage.apply(|s| {
            s.distinct = true;
            Ok(())
        });
        self
    }

    /// Set the table or table expression to select from
    pub fn from(&mut self, from: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.from = from.to_string();
            Ok(())
        });
        self
    }

    /// Add a WHERE condition; `condition` holds one placeholder per value
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
        self.push_in(column, values.into_values(), false)
    }

    /// Add a `column not in(?,...)` condition
    pub fn where_not_in<V: IntoValues>(&mut self, column: &str, values: V) -> &mut Self {
        self.push_in(column, values.into_values(), true)
    }

    fn push_in(&mut self, column: &str, values: Vec<Value>, negate: bool) -> &mut Self {
        let holder = self.dialect.holder();
        self.stage.apply(|s| {
            s.wheres.push(Condition::in_list(column, values, negate, holder)?);
            Ok(())
        });
        self
    }

    /// Add a GROUP BY term
    pub fn group_by(&mut self, group: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.group_bys.push(group.to_string());
            Ok(())
        });
        self
    }

    /// Add a HAVING condition
    pub fn having<V: IntoValues>(&mut self, condition: &str, values: V) -> &mut Self {
        let holder = self.dialect.holder();
        let values = values.into_values();
        self.stage.apply(|s| {
            s.havings.push(Condition::new(condition, values, holder)?);
            Ok(())
        });
        self
    }

    /// Add a raw ORDER BY term, e.g. `"created_at DESC"`
    pub fn order_by(&mut self, order: &str) -> &mut Self {
        self.stage.apply(|s| {
            s.order_bys.push(order.to_string());
            Ok(())
        });
        self
    }

    /// Add an ORDER BY ASC term (convenience method)
    pub fn order_by_asc(&mut self, column: &str) -> &mut Self {
        self.order_by(&order_term(column, SortDirection::Asc))
    }

    /// Add an ORDER BY DESC term (convenience method)
    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by(&order_term(column, SortDirection::Desc))
    }

    /// Set the LIMIT, bound as an argument
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.stage.apply(|s| {
            s.limit = Some(limit);
            Ok(())
        });
        self
    }

    /// Set the OFFSET, bound as an argument
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.stage.apply(|s| {
            s.offset = Some(offset);
            Ok(())
        });
        self
    }

    /// Page-based LIMIT/OFFSET; `page` starts at 1
    pub fn limit_pp(&mut self, page: i64, page_size: i64) -> &mut Self {
        self.stage.apply(|s| {
            if page < 1 || page_size < 0 {
                return Err(BuildError::configuration(format!(
                    "page {page} of size {page_size} is out of range, pages start at 1"
                )));
            }
            let offset = (page - 1).checked_mul(page_size).ok_or_else(|| {
                BuildError::configuration(format!("page {page} of size {page_size} overflows"))
            })?;
            s.limit = Some(page_size);
            s.offset = Some(offset);
            Ok(())
        });
        self
    }

    /// Take an exclusive row lock (`FOR UPDATE` on MySQL)
    pub fn for_update(&mut self) -> &mut Self {
        self.lock(LockMode::Update)
    }

    /// Take a shared row lock (`LOCK IN SHARE MODE` on MySQL)
    pub fn lock_in_share(&mut self) -> &mut Self {
        self.lock(LockMode::Share)
    }

    fn lock(&mut self, mode: LockMode) -> &mut Self {
        let dialect = self.dialect.as_ref();
        self.stage.apply(|s| {
            lock_clause(dialect, mode)?;
            s.lock = mode;
            Ok(())
        });
        self
    }

    /// Count matching rows: `SELECT count(0) FROM t WHERE ...`.
    ///
    /// Uses the same WHERE, GROUP BY and HAVING as the select itself;
    /// ordering, paging and locking are left out.
    pub fn count_sql(&self, expr: Option<&str>) -> Result<Statement> {
        let expr = expr.unwrap_or(DEFAULT_COUNT_EXPR);
        let stmt = self.stage.state().and_then(|s| s.render_count(expr))?;
        Ok(stmt)
    }

    /// Count rows of the select wrapped as a derived table:
    /// `SELECT count(0) FROM( SELECT ... )alias`
    pub fn count_result_sql(&self, alias: &str, expr: Option<&str>) -> Result<Statement> {
        let expr = expr.unwrap_or(DEFAULT_COUNT_EXPR);
        let stmt = self
            .stage
            .state()
            .and_then(|s| s.render_count_result(alias, expr))?;
        Ok(stmt)
    }

    /// Run [`SelectBuilder::count_sql`] and return the count with the SQL used
    pub async fn count_cond<E: Executor>(
        &self,
        executor: &E,
        expr: Option<&str>,
    ) -> Result<(i64, String)> {
        let stmt = self.count_sql(expr)?;
        let count = fetch_count(executor, &stmt).await?;
        Ok((count, stmt.sql))
    }

    /// Run [`SelectBuilder::count_result_sql`] and return the count with the SQL used
    pub async fn count_result<E: Executor>(
        &self,
        executor: &E,
        alias: &str,
        expr: Option<&str>,
    ) -> Result<(i64, String)> {
        let stmt = self.count_result_sql(alias, expr)?;
        let count = fetch_count(executor, &stmt).await?;
        Ok((count, stmt.sql))
    }
}

impl QueryBuilder for SelectBuilder {
    fn to_sql(&mut self) -> Result<Statement> {
        let dialect = self.dialect.as_ref();
        compile(&mut self.stage, &mut self.compiled, "select", |s| s.render(dialect))
    }

    fn error(&self) -> Option<&BuildError> {
        self.stage.error()
    }

    fn reset(&mut self) {
        self.stage = Stage::default();
        self.compiled = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{count_holders, MySql, Sqlite};

    fn builder() -> SelectBuilder {
        SelectBuilder::new(Arc::new(MySql))
    }

    #[test]
    fn test_basic_select() {
        let mut query = builder();
        query.select("*").from("users");
        let stmt = query.to_sql().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_full_clause_order() {
        let mut query = builder();
        query
            .select(("dept", "count(*) AS n"))
            .distinct()
            .from("staff")
            .where_("age > ?", [30])
            .where_in("city", ["Oslo", "Rome"])
            .group_by("dept")
            .having("count(*) > ?", [2])
            .order_by_desc("n")
            .limit(10)
            .offset(20)
            .for_update();

        let stmt = query.to_sql().unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT DISTINCT dept, count(*) AS n FROM staff \
             WHERE (age > ?) AND (city in(?,?)) \
             GROUP BY dept HAVING (count(*) > ?) \
             ORDER BY n DESC LIMIT ? OFFSET ? FOR UPDATE"
        );
        assert_eq!(
            stmt.args,
            vec![
                Value::I32(30),
                Value::String("Oslo".into()),
                Value::String("Rome".into()),
                Value::I32(2),
                Value::I64(10),
                Value::I64(20),
            ]
        );
        assert_eq!(count_holders(&stmt.sql, '?'), stmt.args.len());
    }

    #[test]
    fn test_where_in_args_in_order() {
        let mut query = builder();
        query
            .select("id")
            .from("t")
            .where_("kind = ?", ["a"])
            .where_in("id", [7, 8, 9]);
        let stmt = query.to_sql().unwrap();
        assert!(stmt.sql.ends_with("(id in(?,?,?))"));
        assert_eq!(
            &stmt.args[stmt.args.len() - 3..],
            &[Value::I32(7), Value::I32(8), Value::I32(9)]
        );
    }

    #[test]
    fn test_where_not_in() {
        let mut query = builder();
        query.select("id").from("t").where_not_in("state", ["gone"]);
        assert_eq!(
            query.to_sql().unwrap().sql,
            "SELECT id FROM t WHERE (state not in(?))"
        );
    }

    #[test]
    fn test_lock_in_share_mode() {
        let mut query = builder();
        query.select("id").from("t").lock_in_share();
        assert_eq!(
            query.to_sql().unwrap().sql,
            "SELECT id FROM t LOCK IN SHARE MODE"
        );
    }

    #[test]
    fn test_missing_from_is_deferred() {
        let mut query = builder();
        query.select("id").where_("a = ?", [1]);
        assert!(query.error().is_none());

        let err = query.to_sql().unwrap_err();
        assert!(err.to_string().contains("requires a table"));
        assert!(matches!(
            query.error(),
            Some(BuildError::Configuration { .. })
        ));
    }

    #[test]
    fn test_missing_columns_is_configuration_error() {
        let mut query = builder();
        query.from("t");
        let err = query.to_sql().unwrap_err();
        assert!(err.to_string().contains("at least one column"));
    }

    #[test]
    fn test_placeholder_mismatch_surfaces_at_to_sql() {
        let mut query = builder();
        query
            .select("id")
            .from("t")
            .where_("a = ? AND b = ?", [1])
            .where_("c = ?", [3]);
        let err = query.to_sql().unwrap_err();
        assert!(err.to_string().starts_with("Composition error"));
    }

    #[test]
    fn test_to_sql_is_idempotent() {
        let mut query = builder();
        query.select("id").from("t").where_("a = ?", [1]).limit(5);
        let first = query.to_sql().unwrap();
        let second = query.to_sql().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cached_after_generation() {
        let mut query = builder();
        query.select("id").from("t");
        let first = query.to_sql().unwrap();
        query.where_("late = ?", [1]);
        assert_eq!(query.to_sql().unwrap(), first);
    }

    #[test]
    fn test_reset_matches_fresh_builder() {
        let mut reused = builder();
        reused
            .select(["a", "b"])
            .from("old")
            .where_("x = ?", [1])
            .group_by("a")
            .having("count(*) > ?", [1])
            .order_by("a")
            .limit(1)
            .offset(2)
            .for_update();
        reused.to_sql().unwrap();
        reused.reset();
        reused.select("id").from("t").where_("id = ?", [5]);

        let mut fresh = builder();
        fresh.select("id").from("t").where_("id = ?", [5]);

        assert_eq!(reused.to_sql().unwrap(), fresh.to_sql().unwrap());
    }

    #[test]
    fn test_reset_clears_captured_error() {
        let mut query = builder();
        query.select("id").where_in("id", Vec::<i32>::new());
        assert!(query.error().is_some());
        query.reset();
        assert!(query.error().is_none());
    }

    #[test]
    fn test_limit_pp() {
        let mut paged = builder();
        paged.select("id").from("t").limit_pp(2, 20);

        let mut explicit = builder();
        explicit.select("id").from("t").limit(20).offset(20);

        assert_eq!(paged.to_sql().unwrap(), explicit.to_sql().unwrap());
    }

    #[test]
    fn test_limit_pp_first_page() {
        let mut query = builder();
        query.select("id").from("t").limit_pp(1, 15);
        assert_eq!(query.to_sql().unwrap().args, vec![Value::I64(15), Value::I64(0)]);
    }

    #[test]
    fn test_count_sql_defaults_and_reuses_state() {
        let mut query = builder();
        query
            .select("dept")
            .distinct()
            .from("staff")
            .where_("age > ?", [30])
            .group_by("dept")
            .having("count(*) > ?", [2])
            .order_by("dept")
            .limit(5);

        let count = query.count_sql(None).unwrap();
        assert_eq!(
            count.sql,
            "SELECT count(0) FROM staff WHERE (age > ?) GROUP BY dept HAVING (count(*) > ?)"
        );
        assert_eq!(count.args, vec![Value::I32(30), Value::I32(2)]);
    }

    #[test]
    fn test_count_sql_custom_expr() {
        let mut query = builder();
        query.select("id").from("t");
        let count = query.count_sql(Some("count(distinct id)")).unwrap();
        assert_eq!(count.sql, "SELECT count(distinct id) FROM t");
    }

    #[test]
    fn test_count_result_sql() {
        let mut query = builder();
        query
            .select("dept")
            .distinct()
            .from("staff")
            .where_("age > ?", [30])
            .order_by("dept")
            .limit(5)
            .for_update();

        let count = query.count_result_sql("tmp", None).unwrap();
        assert_eq!(
            count.sql,
            "SELECT count(0) FROM( SELECT DISTINCT dept FROM staff WHERE (age > ?))tmp"
        );
        assert_eq!(count.args, vec![Value::I32(30)]);
    }

    #[test]
    fn test_count_sql_reports_captured_error() {
        let mut query = builder();
        query.select("id").from("t").where_in("id", Vec::<i32>::new());
        assert!(query.count_sql(None).is_err());
    }

    #[test]
    fn test_limit_pp_rejects_bad_pages() {
        let mut zero = builder();
        zero.select("id").from("t").limit_pp(0, 20);
        assert!(matches!(zero.error(), Some(BuildError::Configuration { .. })));
        assert!(zero.to_sql().unwrap_err().to_string().contains("pages start at 1"));

        let mut huge = builder();
        huge.select("id").from("t").limit_pp(i64::MAX, 20);
        assert!(huge.to_sql().unwrap_err().to_string().contains("overflows"));
    }

    #[test]
    fn test_backslash_escaped_literal_in_condition() {
        let mut query = builder();
        query
            .select("id")
            .from("people")
            .where_(r"name = 'O\'Brien' AND id = ?", [1]);
        let stmt = query.to_sql().unwrap();
        assert_eq!(stmt.sql, r"SELECT id FROM people WHERE (name = 'O\'Brien' AND id = ?)");
        assert_eq!(stmt.args, vec![Value::I32(1)]);
    }

    #[test]
    fn test_sqlite_rejects_row_locks() {
        let mut update = SelectBuilder::new(Arc::new(Sqlite));
        update.select("id").from("t").for_update();
        assert!(matches!(update.error(), Some(BuildError::Configuration { .. })));
        let err = update.to_sql().unwrap_err();
        assert!(err.to_string().contains("sqlite has no Update row lock"));

        let mut share = SelectBuilder::new(Arc::new(Sqlite));
        share.select("id").from("t").lock_in_share();
        assert!(share.to_sql().is_err());
    }

    #[test]
    fn test_sqlite_dialect() {
        let mut query = SelectBuilder::new(Arc::new(Sqlite));
        query.select("id").from("t").limit(1);
        assert_eq!(query.to_sql().unwrap().sql, "SELECT id FROM t LIMIT ?");
    }
}
