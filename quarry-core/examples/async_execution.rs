use quarry_core::{AnyExecutor, ExecutableQuery, PoolSettings, Registry};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Book {
    id: i64,
    title: String,
    year: i64,
}

#[tokio::main]
async fn main() -> quarry_core::Result<()> {
    let registry: Registry<AnyExecutor> = Registry::new();
    let settings = PoolSettings {
        max_open_conns: 1,
        ..PoolSettings::default()
    };
    let db = registry.connect("library", "sqlite::memory:", &settings).await?;

    db.sql(
        "CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, year INTEGER)",
        (),
    )
    .exec(&*db)
    .await?;

    let mut insert = db.insert_into("book");
    insert
        .columns(["id", "title", "year"])
        .values((1, "Dune", 1965))
        .values((2, "Neuromancer", 1984))
        .values((3, "Hyperion", 1989));
    let result = insert.exec(&*db).await?;
    println!("Inserted {} rows", result.rows_affected);

    let mut query = db.select(["id", "title", "year"]);
    query.from("book").where_("year > ?", [1970]).order_by_asc("year");
    let books: Vec<Book> = query.query_to(&*db).await?;
    for book in &books {
        println!("{} {} ({})", book.id, book.title, book.year);
    }

    let (count, sql) = query.count_cond(&*db, None).await?;
    println!("{count} rows matched by: {sql}");

    let mut update = db.update("book");
    update.set("title", "Hyperion Cantos").where_("id = ?", [3]);
    update.exec(&*db).await?;

    let mut first = db.select("*");
    first.from("book").where_("id = ?", [3]);
    let book: Option<Book> = first.query_next(&*db).await?;
    println!("After update: {book:?}");

    Ok(())
}
