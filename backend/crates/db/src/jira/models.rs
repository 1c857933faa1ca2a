use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Board flavour as reported by the Jira Agile API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardType {
    Scrum,
    Kanban,
    Simple,
}

impl BoardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrum => "scrum",
            Self::Kanban => "kanban",
            Self::Simple => "simple",
        }
    }

    /// Only scrum boards run sprints.
    pub fn supports_sprints(&self) -> bool {
        matches!(self, Self::Scrum)
    }
}

impl FromStr for BoardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scrum" => Ok(Self::Scrum),
            "kanban" => Ok(Self::Kanban),
            "simple" => Ok(Self::Simple),
            other => Err(format!("unknown board type: {other}")),
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    Future,
    Active,
    Closed,
}

impl SprintState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Future => "future",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for SprintState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "future" => Ok(Self::Future),
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown sprint state: {other}")),
        }
    }
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub external_id: i64,
    pub name: String,
    pub project_key: String,
    pub board_type: BoardType,
    pub has_sprints: bool,
    pub sprint_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// A fresh, active row for a board seen for the first time.
    pub fn new(external_id: i64, name: String, project_key: String, board_type: BoardType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id,
            name,
            project_key,
            board_type,
            has_sprints: board_type.supports_sprints(),
            sprint_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a freshly fetched version of this board into the stored row.
    ///
    /// Row id, `created_at` and `sprint_count` are kept. Reappearing in a fetch reactivates
    /// the board. Returns `true` when the board was inactive before the merge.
    pub fn absorb(&mut self, fetched: &Board) -> bool {
        let reactivated = !self.is_active;
        self.name = fetched.name.clone();
        self.project_key = fetched.project_key.clone();
        self.board_type = fetched.board_type;
        self.has_sprints = fetched.has_sprints;
        self.is_active = true;
        self.updated_at = Utc::now();
        reactivated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: Uuid,
    pub external_id: i64,
    pub board_id: Uuid,
    pub name: String,
    pub state: SprintState,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    pub goal: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sprint {
    /// Copy every mutable field from `fetched`, keeping row id and `created_at`.
    pub fn absorb(&mut self, fetched: &Sprint) {
        self.board_id = fetched.board_id;
        self.name = fetched.name.clone();
        self.state = fetched.state;
        self.start_date = fetched.start_date;
        self.end_date = fetched.end_date;
        self.complete_date = fetched.complete_date;
        self.goal = fetched.goal.clone();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub external_id: i64,
    pub issue_key: String,
    pub board_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
    pub issue_type: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_account_id: Option<String>,
    pub assignee_name: Option<String>,
    pub reporter_account_id: Option<String>,
    pub reporter_name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub story_points: Option<f64>,
    pub original_estimate_secs: Option<i64>,
    pub remaining_estimate_secs: Option<i64>,
    pub time_spent_secs: Option<i64>,
    pub created_at_jira: Option<DateTime<Utc>>,
    pub updated_at_jira: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub components: Vec<String>,
    pub fix_versions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Copy every mutable field from `fetched`, keeping row id and `created_at`.
    pub fn absorb(&mut self, fetched: &Issue) {
        let Issue {
            id: _,
            external_id: _,
            created_at: _,
            updated_at: _,
            issue_key,
            board_id,
            sprint_id,
            issue_type,
            status,
            priority,
            assignee_account_id,
            assignee_name,
            reporter_account_id,
            reporter_name,
            summary,
            description,
            story_points,
            original_estimate_secs,
            remaining_estimate_secs,
            time_spent_secs,
            created_at_jira,
            updated_at_jira,
            resolved_at,
            due_at,
            labels,
            components,
            fix_versions,
        } = fetched.clone();

        self.issue_key = issue_key;
        self.board_id = board_id;
        self.sprint_id = sprint_id;
        self.issue_type = issue_type;
        self.status = status;
        self.priority = priority;
        self.assignee_account_id = assignee_account_id;
        self.assignee_name = assignee_name;
        self.reporter_account_id = reporter_account_id;
        self.reporter_name = reporter_name;
        self.summary = summary;
        self.description = description;
        self.story_points = story_points;
        self.original_estimate_secs = original_estimate_secs;
        self.remaining_estimate_secs = remaining_estimate_secs;
        self.time_spent_secs = time_spent_secs;
        self.created_at_jira = created_at_jira;
        self.updated_at_jira = updated_at_jira;
        self.resolved_at = resolved_at;
        self.due_at = due_at;
        self.labels = labels;
        self.components = components;
        self.fix_versions = fix_versions;
        self.updated_at = Utc::now();
    }
}

/// Verbatim remote payload kept for traceability, one row per fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPayload {
    pub id: Uuid,
    pub board_id: Option<Uuid>,
    pub data_type: String,
    pub retrieved_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl RawPayload {
    pub fn new(board_id: Option<Uuid>, data_type: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id,
            data_type: data_type.to_string(),
            retrieved_at: Utc::now(),
            payload,
        }
    }
}

/// Rows removed when an inactive board's children are purged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub issues_deleted: u64,
    pub sprints_deleted: u64,
    pub issues_unlinked: u64,
}
