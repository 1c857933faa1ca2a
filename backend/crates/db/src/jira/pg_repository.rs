use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::jira::models::{
    Board, BoardType, Issue, PurgeCounts, RawPayload, Sprint, SprintState,
};
use crate::jira::repositories::{
    BoardRepository, IssueRepository, RawPayloadRepository, SprintRepository,
};
use crate::map_write_error;
use strata_common::error::{StrataError, StrataResult};

const BOARD_COLUMNS: &str = "id, external_id, name, project_key, board_type, has_sprints, \
     sprint_count, is_active, created_at, updated_at";

const SPRINT_COLUMNS: &str = "id, external_id, board_id, name, state, start_date, end_date, \
     complete_date, goal, created_at, updated_at";

const ISSUE_COLUMNS: &str = "id, external_id, issue_key, board_id, sprint_id, issue_type, status, \
     priority, assignee_account_id, assignee_name, reporter_account_id, reporter_name, summary, \
     description, story_points, original_estimate_secs, remaining_estimate_secs, time_spent_secs, \
     created_at_jira, updated_at_jira, resolved_at, due_at, labels, components, fix_versions, \
     created_at, updated_at";

#[derive(Clone)]
pub struct PgJiraRepository {
    pool: PgPool,
}

impl PgJiraRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_board_row(row: PgRow) -> StrataResult<Board> {
        let board_type_raw: String = row.get("board_type");
        let board_type = BoardType::from_str(&board_type_raw).map_err(StrataError::Internal)?;

        Ok(Board {
            id: row.get("id"),
            external_id: row.get("external_id"),
            name: row.get("name"),
            project_key: row.get("project_key"),
            board_type,
            has_sprints: row.get("has_sprints"),
            sprint_count: row.get("sprint_count"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn map_sprint_row(row: PgRow) -> StrataResult<Sprint> {
        let state_raw: String = row.get("state");
        let state = SprintState::from_str(&state_raw).map_err(StrataError::Internal)?;

        Ok(Sprint {
            id: row.get("id"),
            external_id: row.get("external_id"),
            board_id: row.get("board_id"),
            name: row.get("name"),
            state,
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            complete_date: row.get("complete_date"),
            goal: row.get("goal"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn map_issue_row(row: PgRow) -> StrataResult<Issue> {
        Ok(Issue {
            id: row.get("id"),
            external_id: row.get("external_id"),
            issue_key: row.get("issue_key"),
            board_id: row.get("board_id"),
            sprint_id: row.get("sprint_id"),
            issue_type: row.get("issue_type"),
            status: row.get("status"),
            priority: row.get("priority"),
            assignee_account_id: row.get("assignee_account_id"),
            assignee_name: row.get("assignee_name"),
            reporter_account_id: row.get("reporter_account_id"),
            reporter_name: row.get("reporter_name"),
            summary: row.get("summary"),
            description: row.get("description"),
            story_points: row.get("story_points"),
            original_estimate_secs: row.get("original_estimate_secs"),
            remaining_estimate_secs: row.get("remaining_estimate_secs"),
            time_spent_secs: row.get("time_spent_secs"),
            created_at_jira: row.get("created_at_jira"),
            updated_at_jira: row.get("updated_at_jira"),
            resolved_at: row.get("resolved_at"),
            due_at: row.get("due_at"),
            labels: row.get("labels"),
            components: row.get("components"),
            fix_versions: row.get("fix_versions"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn list_boards_by_activity(&self, is_active: bool) -> StrataResult<Vec<Board>> {
        let rows = sqlx::query(&format!(
            "select {BOARD_COLUMNS} from jira_boards where is_active = $1 order by external_id"
        ))
        .bind(is_active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_board_row).collect()
    }
}

#[async_trait]
impl BoardRepository for PgJiraRepository {
    async fn find_board_by_external_id(&self, external_id: i64) -> StrataResult<Option<Board>> {
        let row = sqlx::query(&format!(
            "select {BOARD_COLUMNS} from jira_boards where external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        row.map(Self::map_board_row).transpose()
    }

    async fn insert_board(&self, board: &Board) -> StrataResult<Board> {
        let row = sqlx::query(&format!(
            "insert into jira_boards
             (id, external_id, name, project_key, board_type, has_sprints, sprint_count,
              is_active, created_at, updated_at)
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             returning {BOARD_COLUMNS}"
        ))
        .bind(board.id)
        .bind(board.external_id)
        .bind(&board.name)
        .bind(&board.project_key)
        .bind(board.board_type.as_str())
        .bind(board.has_sprints)
        .bind(board.sprint_count)
        .bind(board.is_active)
        .bind(board.created_at)
        .bind(board.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::map_board_row(row)
    }

    async fn update_board(&self, board: &Board) -> StrataResult<Board> {
        let row = sqlx::query(&format!(
            "update jira_boards
             set name = $1, project_key = $2, board_type = $3, has_sprints = $4,
                 is_active = $5, updated_at = $6
             where id = $7
             returning {BOARD_COLUMNS}"
        ))
        .bind(&board.name)
        .bind(&board.project_key)
        .bind(board.board_type.as_str())
        .bind(board.has_sprints)
        .bind(board.is_active)
        .bind(board.updated_at)
        .bind(board.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?
        .ok_or_else(|| StrataError::NotFound(format!("board row {}", board.id)))?;

        Self::map_board_row(row)
    }

    async fn list_active_boards(&self) -> StrataResult<Vec<Board>> {
        self.list_boards_by_activity(true).await
    }

    async fn list_inactive_boards(&self) -> StrataResult<Vec<Board>> {
        self.list_boards_by_activity(false).await
    }

    async fn deactivate_boards(&self, ids: &[Uuid]) -> StrataResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "update jira_boards set is_active = false, updated_at = now()
             where id = any($1) and is_active",
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn set_sprint_count(&self, board_id: Uuid, sprint_count: i32) -> StrataResult<()> {
        sqlx::query("update jira_boards set sprint_count = $1, updated_at = now() where id = $2")
            .bind(sprint_count)
            .bind(board_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StrataError::Database(e.to_string()))?;
        Ok(())
    }

    async fn purge_board_children(&self, board_id: Uuid) -> StrataResult<PurgeCounts> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StrataError::Database(e.to_string()))?;

        let unlinked = sqlx::query(
            "update jira_issues set sprint_id = null, updated_at = now()
             where board_id is distinct from $1
               and sprint_id in (select id from jira_sprints where board_id = $1)",
        )
        .bind(board_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        let issues = sqlx::query("delete from jira_issues where board_id = $1")
            .bind(board_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StrataError::Database(e.to_string()))?;

        let sprints = sqlx::query("delete from jira_sprints where board_id = $1")
            .bind(board_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StrataError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StrataError::Database(e.to_string()))?;

        Ok(PurgeCounts {
            issues_deleted: issues.rows_affected(),
            sprints_deleted: sprints.rows_affected(),
            issues_unlinked: unlinked.rows_affected(),
        })
    }
}

#[async_trait]
impl SprintRepository for PgJiraRepository {
    async fn find_sprint_by_external_id(&self, external_id: i64) -> StrataResult<Option<Sprint>> {
        let row = sqlx::query(&format!(
            "select {SPRINT_COLUMNS} from jira_sprints where external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        row.map(Self::map_sprint_row).transpose()
    }

    async fn insert_sprint(&self, sprint: &Sprint) -> StrataResult<Sprint> {
        let row = sqlx::query(&format!(
            "insert into jira_sprints
             (id, external_id, board_id, name, state, start_date, end_date, complete_date,
              goal, created_at, updated_at)
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             returning {SPRINT_COLUMNS}"
        ))
        .bind(sprint.id)
        .bind(sprint.external_id)
        .bind(sprint.board_id)
        .bind(&sprint.name)
        .bind(sprint.state.as_str())
        .bind(sprint.start_date)
        .bind(sprint.end_date)
        .bind(sprint.complete_date)
        .bind(&sprint.goal)
        .bind(sprint.created_at)
        .bind(sprint.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::map_sprint_row(row)
    }

    async fn update_sprint(&self, sprint: &Sprint) -> StrataResult<Sprint> {
        let row = sqlx::query(&format!(
            "update jira_sprints
             set board_id = $1, name = $2, state = $3, start_date = $4, end_date = $5,
                 complete_date = $6, goal = $7, updated_at = $8
             where id = $9
             returning {SPRINT_COLUMNS}"
        ))
        .bind(sprint.board_id)
        .bind(&sprint.name)
        .bind(sprint.state.as_str())
        .bind(sprint.start_date)
        .bind(sprint.end_date)
        .bind(sprint.complete_date)
        .bind(&sprint.goal)
        .bind(sprint.updated_at)
        .bind(sprint.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?
        .ok_or_else(|| StrataError::NotFound(format!("sprint row {}", sprint.id)))?;

        Self::map_sprint_row(row)
    }

    async fn list_sprints_for_board(&self, board_id: Uuid) -> StrataResult<Vec<Sprint>> {
        let rows = sqlx::query(&format!(
            "select {SPRINT_COLUMNS} from jira_sprints where board_id = $1 order by external_id"
        ))
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_sprint_row).collect()
    }

    async fn count_sprints_for_board(&self, board_id: Uuid) -> StrataResult<i64> {
        let row = sqlx::query("select count(*) as cnt from jira_sprints where board_id = $1")
            .bind(board_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StrataError::Database(e.to_string()))?;
        Ok(row.get::<i64, _>("cnt"))
    }
}

#[async_trait]
impl IssueRepository for PgJiraRepository {
    async fn find_issue_by_external_id(&self, external_id: i64) -> StrataResult<Option<Issue>> {
        let row = sqlx::query(&format!(
            "select {ISSUE_COLUMNS} from jira_issues where external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;

        row.map(Self::map_issue_row).transpose()
    }

    async fn insert_issue(&self, issue: &Issue) -> StrataResult<Issue> {
        let row = sqlx::query(&format!(
            "insert into jira_issues
             (id, external_id, issue_key, board_id, sprint_id, issue_type, status, priority,
              assignee_account_id, assignee_name, reporter_account_id, reporter_name, summary,
              description, story_points, original_estimate_secs, remaining_estimate_secs,
              time_spent_secs, created_at_jira, updated_at_jira, resolved_at, due_at, labels,
              components, fix_versions, created_at, updated_at)
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                     $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
             returning {ISSUE_COLUMNS}"
        ))
        .bind(issue.id)
        .bind(issue.external_id)
        .bind(&issue.issue_key)
        .bind(issue.board_id)
        .bind(issue.sprint_id)
        .bind(&issue.issue_type)
        .bind(&issue.status)
        .bind(&issue.priority)
        .bind(&issue.assignee_account_id)
        .bind(&issue.assignee_name)
        .bind(&issue.reporter_account_id)
        .bind(&issue.reporter_name)
        .bind(&issue.summary)
        .bind(&issue.description)
        .bind(issue.story_points)
        .bind(issue.original_estimate_secs)
        .bind(issue.remaining_estimate_secs)
        .bind(issue.time_spent_secs)
        .bind(issue.created_at_jira)
        .bind(issue.updated_at_jira)
        .bind(issue.resolved_at)
        .bind(issue.due_at)
        .bind(&issue.labels)
        .bind(&issue.components)
        .bind(&issue.fix_versions)
        .bind(issue.created_at)
        .bind(issue.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::map_issue_row(row)
    }

    async fn update_issue(&self, issue: &Issue) -> StrataResult<Issue> {
        let row = sqlx::query(&format!(
            "update jira_issues
             set issue_key = $1, board_id = $2, sprint_id = $3, issue_type = $4, status = $5,
                 priority = $6, assignee_account_id = $7, assignee_name = $8,
                 reporter_account_id = $9, reporter_name = $10, summary = $11,
                 description = $12, story_points = $13, original_estimate_secs = $14,
                 remaining_estimate_secs = $15, time_spent_secs = $16, created_at_jira = $17,
                 updated_at_jira = $18, resolved_at = $19, due_at = $20, labels = $21,
                 components = $22, fix_versions = $23, updated_at = $24
             where id = $25
             returning {ISSUE_COLUMNS}"
        ))
        .bind(&issue.issue_key)
        .bind(issue.board_id)
        .bind(issue.sprint_id)
        .bind(&issue.issue_type)
        .bind(&issue.status)
        .bind(&issue.priority)
        .bind(&issue.assignee_account_id)
        .bind(&issue.assignee_name)
        .bind(&issue.reporter_account_id)
        .bind(&issue.reporter_name)
        .bind(&issue.summary)
        .bind(&issue.description)
        .bind(issue.story_points)
        .bind(issue.original_estimate_secs)
        .bind(issue.remaining_estimate_secs)
        .bind(issue.time_spent_secs)
        .bind(issue.created_at_jira)
        .bind(issue.updated_at_jira)
        .bind(issue.resolved_at)
        .bind(issue.due_at)
        .bind(&issue.labels)
        .bind(&issue.components)
        .bind(&issue.fix_versions)
        .bind(issue.updated_at)
        .bind(issue.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?
        .ok_or_else(|| StrataError::NotFound(format!("issue row {}", issue.id)))?;

        Self::map_issue_row(row)
    }
}

#[async_trait]
impl RawPayloadRepository for PgJiraRepository {
    async fn record_payload(&self, payload: &RawPayload) -> StrataResult<()> {
        sqlx::query(
            "insert into jira_raw_payloads (id, board_id, data_type, retrieved_at, payload)
             values ($1, $2, $3, $4, $5)",
        )
        .bind(payload.id)
        .bind(payload.board_id)
        .bind(&payload.data_type)
        .bind(payload.retrieved_at)
        .bind(&payload.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| StrataError::Database(e.to_string()))?;
        Ok(())
    }
}
