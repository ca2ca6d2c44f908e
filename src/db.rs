use crate::models::UrlMapping;
use chrono::NaiveDateTime;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqliteConnection, SqliteExecutor, SqlitePool,
};

const MAPPING_COLUMNS: &str = "id, original, short, visit_count, created_at, last_visited";

// ── Pool ───────────────────────────────────────────────────────────────────

/// Open the SQLite pool (creating the file if it doesn't exist yet) and run
/// the embedded migrations.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(
            database_url
                .parse::<SqliteConnectOptions>()?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
        )
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");
    pool
}

// ── Identifier counter ─────────────────────────────────────────────────────

/// The id the next inserted row will receive.
///
/// Reads the AUTOINCREMENT counter for `urls`, never going below the highest
/// id currently stored. Call it inside the transaction that performs the
/// insert.
pub async fn next_id(conn: impl SqliteExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT MAX(
                COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'urls'), 0),
                COALESCE((SELECT MAX(id) FROM urls), 0)
            ) + 1",
    )
    .fetch_one(conn)
    .await
}

/// Force the counter so that the next issued id is `last_issued + 1`.
pub async fn reset_counter(conn: &mut SqliteConnection, last_issued: i64) -> Result<(), sqlx::Error> {
    let updated = sqlx::query("UPDATE sqlite_sequence SET seq = ?1 WHERE name = 'urls'")
        .bind(last_issued)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    // No row is written to sqlite_sequence until the first insert.
    if updated == 0 {
        sqlx::query("INSERT INTO sqlite_sequence (name, seq) VALUES ('urls', ?1)")
            .bind(last_issued)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

// ── Mappings ───────────────────────────────────────────────────────────────

/// Insert a mapping under an explicit id and return the stored row.
/// `created_at` and `last_visited` both start at `now`.
pub async fn insert_mapping(
    conn: &mut SqliteConnection,
    id: i64,
    original: &str,
    short: &str,
    now: NaiveDateTime,
) -> Result<UrlMapping, sqlx::Error> {
    sqlx::query(
        "INSERT INTO urls (id, original, short, visit_count, created_at, last_visited)
         VALUES (?1, ?2, ?3, 0, ?4, ?4)",
    )
    .bind(id)
    .bind(original)
    .bind(short)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let mapping: UrlMapping =
        sqlx::query_as(&format!("SELECT {MAPPING_COLUMNS} FROM urls WHERE id = ?1"))
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(mapping)
}

/// Whether any live row already uses `short`.
pub async fn code_exists(conn: impl SqliteExecutor<'_>, short: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM urls WHERE short = ?1)")
        .bind(short)
        .fetch_one(conn)
        .await
}

/// Fetch the first mapping carrying `short`.
pub async fn find_by_code(
    conn: impl SqliteExecutor<'_>,
    short: &str,
) -> Result<Option<UrlMapping>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {MAPPING_COLUMNS} FROM urls WHERE short = ?1 ORDER BY id LIMIT 1"
    ))
    .bind(short)
    .fetch_optional(conn)
    .await
}

/// Fetch a single mapping by its id.
pub async fn find_by_id(
    conn: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<Option<UrlMapping>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {MAPPING_COLUMNS} FROM urls WHERE id = ?1"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Every mapping, ascending by id.
pub async fn list_all(conn: impl SqliteExecutor<'_>) -> Result<Vec<UrlMapping>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {MAPPING_COLUMNS} FROM urls ORDER BY id ASC"))
        .fetch_all(conn)
        .await
}

/// Remove a mapping. Returns `false` when no row had that id.
pub async fn delete_by_id(conn: impl SqliteExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query("DELETE FROM urls WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Current ids, ascending.
pub async fn ids_ascending(conn: impl SqliteExecutor<'_>) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM urls ORDER BY id ASC")
        .fetch_all(conn)
        .await
}

/// Move one row from `from` to `to`. Returns `false` if `from` didn't exist.
pub async fn move_id(conn: impl SqliteExecutor<'_>, from: i64, to: i64) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query("UPDATE urls SET id = ?2 WHERE id = ?1")
        .bind(from)
        .bind(to)
        .execute(conn)
        .await?
        .rows_affected();

    Ok(affected == 1)
}

/// Bump the visit counter and stamp `last_visited` in one statement.
///
/// Addressed by the UNIQUE `short` column rather than by id, so a visit still
/// lands on its row when a concurrent delete renumbers it between lookup and
/// update.
pub async fn record_visit(
    conn: impl SqliteExecutor<'_>,
    short: &str,
    now: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        "UPDATE urls SET visit_count = visit_count + 1, last_visited = ?2 WHERE short = ?1",
    )
    .bind(short)
    .bind(now)
    .execute(conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// True when `err` is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}
