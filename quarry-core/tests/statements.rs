use std::sync::Arc;

use parking_lot::Mutex;
use quarry_core::{
    BuildError, Conn, Error, ExecResult, ExecutableQuery, Executor, QueryBuilder, Record, Registry,
    Sqlite, Statement, Value,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Executor that records statements and answers with fixed rows
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Statement>>,
    rows: Vec<serde_json::Value>,
}

impl Recorder {
    fn with_rows(rows: Vec<serde_json::Value>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn seen(&self) -> Vec<Statement> {
        self.seen.lock().clone()
    }

    fn push(&self, sql: &str, args: &[Value]) {
        self.seen.lock().push(Statement::new(sql, args.to_vec()));
    }
}

impl Executor for Recorder {
    async fn execute(&self, sql: &str, args: &[Value]) -> quarry_core::Result<ExecResult> {
        self.push(sql, args);
        Ok(ExecResult {
            rows_affected: self.rows.len() as u64,
            last_insert_id: None,
        })
    }

    async fn fetch_all<T>(&self, sql: &str, args: &[Value]) -> quarry_core::Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.push(sql, args);
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            out.push(serde_json::from_value(row.clone())?);
        }
        Ok(out)
    }

    async fn fetch_one<T>(&self, sql: &str, args: &[Value]) -> quarry_core::Result<T>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.fetch_optional(sql, args)
            .await?
            .ok_or_else(|| Error::execution("no rows"))
    }

    async fn fetch_optional<T>(&self, sql: &str, args: &[Value]) -> quarry_core::Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.push(sql, args);
        match self.rows.first() {
            Some(row) => Ok(Some(serde_json::from_value(row.clone())?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Article {
    id: i64,
    #[serde(rename = "headline")]
    title: String,
    views: i64,
    #[serde(skip)]
    dirty: bool,
}

fn article(id: i64) -> Article {
    Article {
        id,
        title: format!("a{id}"),
        views: id * 10,
        dirty: true,
    }
}

struct Tally {
    key: &'static str,
    n: i64,
}

impl Record for Tally {
    fn columns() -> Vec<&'static str> {
        vec!["key", "n"]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.key.into(), self.n.into()]
    }
}

fn placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}

#[tokio::test]
async fn select_round_trip_through_registry() {
    let registry = Registry::new();
    registry
        .register(Conn::new(
            "reports",
            Arc::new(Sqlite),
            Recorder::with_rows(vec![serde_json::json!({"id": 1, "headline": "x", "views": 3})]),
        ))
        .unwrap();
    let conn = registry.open("reports").unwrap();

    let mut query = conn.select(["id", "headline", "views"]);
    query
        .from("article")
        .where_("views > ?", [1])
        .where_in("id", [1, 2, 3])
        .order_by_desc("views")
        .limit_pp(1, 10);

    let rows: Vec<Article> = query.query_to(&*conn).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "x");
    assert!(!rows[0].dirty);

    let seen = conn.executor().seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].sql,
        "SELECT id, headline, views FROM article WHERE (views > ?) AND (id in(?,?,?)) \
         ORDER BY views DESC LIMIT ? OFFSET ?"
    );
    assert_eq!(placeholders(&seen[0].sql), seen[0].args.len());
    assert_eq!(
        &seen[0].args[1..4],
        &[Value::I32(1), Value::I32(2), Value::I32(3)]
    );
}

#[tokio::test]
async fn deferred_error_never_reaches_executor() {
    let conn = Conn::new("main", Arc::new(Sqlite), Recorder::default());

    let mut query = conn.select("id");
    query.where_("a = ? AND b = ?", [1]).from("t");

    let err = query.exec(&conn).await.unwrap_err();
    assert!(matches!(err, Error::Build(BuildError::Composition { .. })));
    let rows: quarry_core::Result<Vec<Article>> = query.query_to(&conn).await;
    assert!(rows.is_err());
    assert!(conn.executor().seen().is_empty());
}

#[tokio::test]
async fn update_from_model_with_explicit_columns() {
    let conn = Conn::new("main", Arc::new(Sqlite), Recorder::default());

    let mut update = conn.update("");
    update
        .columns(["views", "headline"])
        .model(&article(4))
        .where_("id = ?", [4]);
    update.exec(&conn).await.unwrap();

    let seen = conn.executor().seen();
    assert_eq!(seen[0].sql, "UPDATE article SET views=?, headline=? WHERE (id = ?)");
    assert_eq!(
        seen[0].args,
        vec![Value::I64(40), Value::String("a4".into()), Value::I32(4)]
    );
}

#[tokio::test]
async fn insert_upsert_and_replace() {
    let conn = Conn::new("main", Arc::new(Sqlite), Recorder::default());

    let mut insert = conn.insert_into("");
    insert.models(&[article(1), article(2)]);
    insert.exec(&conn).await.unwrap();

    let mut upsert = conn.insert_or_update("tally");
    upsert
        .records(&[Tally { key: "a", n: 1 }])
        .update("n", Value::Json(serde_json::json!(2)));
    upsert.exec(&conn).await.unwrap();

    let mut replace = conn.replace_into("tally");
    replace.records(&[Tally { key: "b", n: 2 }, Tally { key: "c", n: 3 }]);
    replace.exec(&conn).await.unwrap();

    let seen = conn.executor().seen();
    assert_eq!(
        seen[0].sql,
        "INSERT INTO article (id, headline, views) VALUES (?, ?, ?), (?, ?, ?)"
    );
    assert_eq!(
        seen[1].sql,
        "INSERT INTO tally (key, n) VALUES (?, ?) ON CONFLICT DO UPDATE SET n=?"
    );
    assert_eq!(seen[1].args.len(), 3);
    assert_eq!(seen[2].sql, "REPLACE INTO tally (key, n) VALUES (?, ?), (?, ?)");
    for stmt in &seen {
        assert_eq!(placeholders(&stmt.sql), stmt.args.len());
    }
}

#[tokio::test]
async fn count_helpers_share_select_state() {
    let conn = Conn::new(
        "main",
        Arc::new(Sqlite),
        Recorder::with_rows(vec![serde_json::json!({"total": 12})]),
    );

    let mut query = conn.select("author");
    query
        .from("article")
        .where_("views > ?", [5])
        .group_by("author")
        .having("count(*) > ?", [1])
        .order_by("author")
        .limit(3);

    let (count, sql) = query.count_cond(&conn, None).await.unwrap();
    assert_eq!(count, 12);
    assert_eq!(
        sql,
        "SELECT count(0) FROM article WHERE (views > ?) GROUP BY author HAVING (count(*) > ?)"
    );

    let (_, sql) = query.count_result(&conn, "g", None).await.unwrap();
    assert_eq!(
        sql,
        "SELECT count(0) FROM( SELECT author FROM article WHERE (views > ?) \
         GROUP BY author HAVING (count(*) > ?))g"
    );

    let page = query.to_sql().unwrap();
    assert!(page.sql.ends_with("ORDER BY author LIMIT ?"));
}

#[tokio::test]
async fn reset_builder_is_reusable() {
    let conn = Conn::new("main", Arc::new(Sqlite), Recorder::default());

    let mut delete = conn.delete_from("sessions");
    delete.where_("expired = ?", [true]).limit(10);
    let first = delete.to_sql().unwrap();
    assert_eq!(delete.to_sql().unwrap(), first);

    delete.reset();
    delete.from("tokens").where_in("id", [9]);
    delete.exec(&conn).await.unwrap();

    let seen = conn.executor().seen();
    assert_eq!(seen[0].sql, "DELETE FROM tokens WHERE (id in(?))");
}

#[tokio::test]
async fn raw_statement_runs_as_given() {
    let conn = Conn::new(
        "main",
        Arc::new(Sqlite),
        Recorder::with_rows(vec![serde_json::json!({"v": 1})]),
    );

    let mut raw = conn.sql("SELECT ? AS v", (1,));
    let row: Option<serde_json::Map<String, serde_json::Value>> =
        raw.query_next(&conn).await.unwrap();
    assert_eq!(row.unwrap()["v"], 1);
}
