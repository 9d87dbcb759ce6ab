use quarry_core::{Conn, MySql, QueryBuilder, Record, Value};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct User {
    id: i64,
    #[serde(rename = "user_name")]
    name: String,
    email: String,
    #[serde(skip)]
    #[allow(dead_code)]
    password_hash: String,
}

struct AuditEntry {
    actor: i64,
    action: &'static str,
}

impl Record for AuditEntry {
    fn table_name() -> String {
        "audit_log".to_string()
    }

    fn columns() -> Vec<&'static str> {
        vec!["actor", "action"]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.actor.into(), self.action.into()]
    }
}

fn main() -> quarry_core::Result<()> {
    // Builders only need a dialect to render SQL; `()` stands in for an executor.
    let conn = Conn::new("main", Arc::new(MySql), ());

    let mut select = conn.select(["id", "user_name", "email"]);
    select
        .from("user")
        .where_("created_at > ?", ["2024-01-01"])
        .where_in("status", ["active", "trial"])
        .order_by_desc("id")
        .limit_pp(2, 20);
    let stmt = select.to_sql()?;
    println!("SELECT SQL: {}", stmt.sql);
    println!("  args: {:?}", stmt.args);

    println!("COUNT SQL: {}", select.count_sql(None)?.sql);
    println!("COUNT RESULT SQL: {}", select.count_result_sql("t", None)?.sql);

    let user = User {
        id: 7,
        name: "ada".to_string(),
        email: "ada@example.com".to_string(),
        password_hash: "x".to_string(),
    };

    let mut insert = conn.insert_into("");
    insert.model(&user);
    println!("INSERT SQL: {}", insert.to_sql()?.sql);

    let mut update = conn.update("");
    update.columns("email").model(&user).where_("id = ?", [user.id]);
    println!("UPDATE SQL: {}", update.to_sql()?.sql);

    let mut upsert = conn.insert_or_update("");
    upsert.records(&[
        AuditEntry { actor: 7, action: "login" },
        AuditEntry { actor: 7, action: "logout" },
    ]);
    println!("UPSERT SQL: {}", upsert.to_sql()?.sql);

    let mut delete = conn.delete_from("session");
    delete.where_("expires_at < NOW()", ()).limit(1000);
    println!("DELETE SQL: {}", delete.to_sql()?.sql);

    // Errors are held by the builder until a terminal call.
    let mut broken = conn.select("id");
    broken.where_("a = ? AND b = ?", [1]);
    if let Err(err) = broken.to_sql() {
        println!("Deferred error: {err}");
    }

    Ok(())
}
