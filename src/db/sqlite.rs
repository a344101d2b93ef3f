use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use super::model::*;

pub const MEMORY: &str = ":memory:";

/// Hashed at store startup and verified against when a login names an
/// account that does not exist.
pub(crate) const DUMMY_PASSWORD: &str = "no-such-account";

/// Open a pool on `db_path` and create `schema` if it does not exist yet.
///
/// `:memory:` opens a private in-memory database. It is held by a single
/// connection that is never recycled, since every SQLite connection to
/// `:memory:` sees its own empty database.
pub async fn open_pool(db_path: &str, schema: &str) -> DbResult<SqlitePool> {
    let pool = if db_path == MEMORY {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::raw_sql(schema).execute(&pool).await?;

    info!("Database initialized at {}", db_path);

    Ok(pool)
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

pub(crate) fn not_found(e: sqlx::Error, what: String) -> DbError {
    match e {
        sqlx::Error::RowNotFound => DbError::NotFound(what),
        _ => DbError::Sqlx(e),
    }
}

pub(crate) fn hash_password(password: &str, cost: u32) -> DbResult<String> {
    Ok(bcrypt::hash(password, cost)?)
}

pub(crate) fn verify_password(password: &str, hash: &str) -> DbResult<bool> {
    Ok(bcrypt::verify(password, hash)?)
}
