use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::sync::models::SyncRun;
use crate::sync::repositories::SyncRunRepository;
use strata_common::error::{StrataError, StrataResult};

#[derive(Clone)]
pub struct PgSyncRepository {
    pool: PgPool,
}

impl PgSyncRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: sqlx::postgres::PgRow) -> StrataResult<SyncRun> {
        Ok(SyncRun {
            id: row.get("id"),
            scope: row.get("scope"),
            status: row.get("status"),
            last_started_at: row.get("last_started_at"),
            last_finished_at: row.get("last_finished_at"),
            last_message: row.get("last_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl SyncRunRepository for PgSyncRepository {
    async fn get_or_create(&self, scope: &str) -> StrataResult<SyncRun> {
        let row = sqlx::query(
            "insert into sync_runs (id, scope)
             values ($1, $2)
             on conflict (scope) do update set updated_at = now()
             returning id, scope, status, last_started_at, last_finished_at, last_message, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(scope)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_running(&self, id: Uuid) -> StrataResult<SyncRun> {
        let now = Utc::now();
        let row = sqlx::query(
            "update sync_runs
             set status = 'running', last_started_at = $1, updated_at = $1
             where id = $2
             returning id, scope, status, last_started_at, last_finished_at, last_message, created_at, updated_at",
        )
        .bind(now)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_completed(&self, id: Uuid, message: &str) -> StrataResult<SyncRun> {
        let now = Utc::now();
        let row = sqlx::query(
            "update sync_runs
             set status = 'idle', last_finished_at = $1, last_message = $2, updated_at = $1
             where id = $3
             returning id, scope, status, last_started_at, last_finished_at, last_message, created_at, updated_at",
        )
        .bind(now)
        .bind(message)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> StrataResult<SyncRun> {
        let now = Utc::now();
        let row = sqlx::query(
            "update sync_runs
             set status = 'failed', last_finished_at = $1, last_message = $2, updated_at = $1
             where id = $3
             returning id, scope, status, last_started_at, last_finished_at, last_message, created_at, updated_at",
        )
        .bind(now)
        .bind(error_message)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        Self::map_row(row)
    }
}
