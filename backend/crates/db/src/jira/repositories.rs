use async_trait::async_trait;
use uuid::Uuid;

use crate::jira::models::{Board, Issue, PurgeCounts, RawPayload, Sprint};
use strata_common::error::StrataResult;

#[async_trait]
pub trait BoardRepository: Send + Sync {
    async fn find_board_by_external_id(&self, external_id: i64) -> StrataResult<Option<Board>>;

    /// Insert a new board. A concurrent insert of the same external id surfaces as
    /// `StrataError::Conflict`.
    async fn insert_board(&self, board: &Board) -> StrataResult<Board>;

    async fn update_board(&self, board: &Board) -> StrataResult<Board>;

    async fn list_active_boards(&self) -> StrataResult<Vec<Board>>;

    async fn list_inactive_boards(&self) -> StrataResult<Vec<Board>>;

    /// Flip `is_active` to false for the given rows. Returns the number of rows changed.
    async fn deactivate_boards(&self, ids: &[Uuid]) -> StrataResult<u64>;

    async fn set_sprint_count(&self, board_id: Uuid, sprint_count: i32) -> StrataResult<()>;

    /// Hard-delete a board's issues and sprints. Issues of other boards that point at one of
    /// those sprints are unlinked first so no issue ever references a missing sprint.
    async fn purge_board_children(&self, board_id: Uuid) -> StrataResult<PurgeCounts>;
}

#[async_trait]
pub trait SprintRepository: Send + Sync {
    async fn find_sprint_by_external_id(&self, external_id: i64) -> StrataResult<Option<Sprint>>;
    async fn insert_sprint(&self, sprint: &Sprint) -> StrataResult<Sprint>;
    async fn update_sprint(&self, sprint: &Sprint) -> StrataResult<Sprint>;
    async fn list_sprints_for_board(&self, board_id: Uuid) -> StrataResult<Vec<Sprint>>;
    async fn count_sprints_for_board(&self, board_id: Uuid) -> StrataResult<i64>;
}

#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn find_issue_by_external_id(&self, external_id: i64) -> StrataResult<Option<Issue>>;
    async fn insert_issue(&self, issue: &Issue) -> StrataResult<Issue>;
    async fn update_issue(&self, issue: &Issue) -> StrataResult<Issue>;
}

#[async_trait]
pub trait RawPayloadRepository: Send + Sync {
    async fn record_payload(&self, payload: &RawPayload) -> StrataResult<()>;
}

/// Everything the synchronizers need from storage.
pub trait JiraStore:
    BoardRepository + SprintRepository + IssueRepository + RawPayloadRepository
{
}

impl<T> JiraStore for T where
    T: BoardRepository + SprintRepository + IssueRepository + RawPayloadRepository
{
}
