use async_trait::async_trait;
use serde_json::Value;

use super::models::RemotePage;

/// Read access to the remote tracker.
///
/// Every call yields `None` on any failure (transport, status, decode). Implementations log
/// the cause; callers only decide whether a missing page aborts or degrades their step.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn list_boards(&self, start_at: usize, max_results: usize) -> Option<RemotePage>;

    async fn list_sprints(&self, board_id: i64) -> Option<RemotePage>;

    async fn list_issues(
        &self,
        board_id: i64,
        start_at: usize,
        max_results: usize,
    ) -> Option<RemotePage>;

    async fn board_configuration(&self, board_id: i64) -> Option<Value>;

    async fn list_teams(&self) -> Option<RemotePage>;
}
