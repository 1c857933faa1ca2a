pub mod jira;
pub mod sync;

use strata_common::error::{StrataError, StrataResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> StrataResult<PgPool> {
    tracing::info!(max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> StrataResult<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| StrataError::Database(format!("migration failed: {e}")))
}

/// Map a sqlx error, surfacing unique-constraint violations as `Conflict`.
pub(crate) fn map_write_error(e: sqlx::Error) -> StrataError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StrataError::Conflict(db_err.message().to_string());
        }
    }
    StrataError::Database(e.to_string())
}
