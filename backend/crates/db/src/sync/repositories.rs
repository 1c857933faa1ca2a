use async_trait::async_trait;
use uuid::Uuid;

use crate::sync::models::SyncRun;
use strata_common::error::StrataResult;

/// Bookkeeping for sync triggers. Never used as a lock: overlapping runs of the same scope
/// are allowed and simply overwrite each other's status.
#[async_trait]
pub trait SyncRunRepository: Send + Sync {
    /// Get or create the ledger row for a scope.
    async fn get_or_create(&self, scope: &str) -> StrataResult<SyncRun>;

    /// Record that a run of this scope has started.
    async fn mark_running(&self, id: Uuid) -> StrataResult<SyncRun>;

    /// Mark a run as completed with its summary message.
    async fn mark_completed(&self, id: Uuid, message: &str) -> StrataResult<SyncRun>;

    /// Mark a run as failed with an error message.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> StrataResult<SyncRun>;
}
