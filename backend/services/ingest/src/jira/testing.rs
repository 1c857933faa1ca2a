//! In-memory store, ledger and scripted remote used by the synchronizer tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use strata_common::error::{StrataError, StrataResult};
use strata_db::jira::models::{Board, Issue, PurgeCounts, RawPayload, Sprint};
use strata_db::jira::repositories::{
    BoardRepository, IssueRepository, RawPayloadRepository, SprintRepository,
};
use strata_db::sync::models::SyncRun;
use strata_db::sync::repositories::SyncRunRepository;

use super::models::RemotePage;
use super::source::RemoteSource;

#[derive(Default)]
struct StoreState {
    boards: Vec<Board>,
    sprints: Vec<Sprint>,
    issues: Vec<Issue>,
    payloads: Vec<RawPayload>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    /// Next board insert behaves as if another writer inserted the same board first.
    pub race_next_board_insert: AtomicBool,
    /// Boards whose sprint listing errors.
    pub broken_sprint_lookups: Mutex<HashSet<Uuid>>,
    pub fail_payloads: AtomicBool,
}

impl MemoryStore {
    pub fn boards(&self) -> Vec<Board> {
        self.state.lock().unwrap().boards.clone()
    }

    pub fn board(&self, external_id: i64) -> Option<Board> {
        self.boards().into_iter().find(|b| b.external_id == external_id)
    }

    pub fn sprints(&self) -> Vec<Sprint> {
        self.state.lock().unwrap().sprints.clone()
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.state.lock().unwrap().issues.clone()
    }

    pub fn issue(&self, external_id: i64) -> Option<Issue> {
        self.issues().into_iter().find(|i| i.external_id == external_id)
    }

    pub fn payloads(&self) -> Vec<RawPayload> {
        self.state.lock().unwrap().payloads.clone()
    }

    pub fn seed_board(&self, board: Board) {
        self.state.lock().unwrap().boards.push(board);
    }

    pub fn seed_sprint(&self, sprint: Sprint) {
        self.state.lock().unwrap().sprints.push(sprint);
    }

    pub fn seed_issue(&self, issue: Issue) {
        self.state.lock().unwrap().issues.push(issue);
    }

    pub fn break_sprint_lookup(&self, board_id: Uuid) {
        self.broken_sprint_lookups.lock().unwrap().insert(board_id);
    }
}

#[async_trait]
impl BoardRepository for MemoryStore {
    async fn find_board_by_external_id(&self, external_id: i64) -> StrataResult<Option<Board>> {
        Ok(self.board(external_id))
    }

    async fn insert_board(&self, board: &Board) -> StrataResult<Board> {
        let mut state = self.state.lock().unwrap();
        if self.race_next_board_insert.swap(false, Ordering::SeqCst) {
            let mut winner = board.clone();
            winner.id = Uuid::new_v4();
            state.boards.push(winner);
            return Err(StrataError::Conflict("jira_boards_external_id_key".into()));
        }
        if state.boards.iter().any(|b| b.external_id == board.external_id) {
            return Err(StrataError::Conflict("jira_boards_external_id_key".into()));
        }
        state.boards.push(board.clone());
        Ok(board.clone())
    }

    async fn update_board(&self, board: &Board) -> StrataResult<Board> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .boards
            .iter_mut()
            .find(|b| b.id == board.id)
            .ok_or_else(|| StrataError::NotFound(format!("board {}", board.id)))?;
        let created_at = row.created_at;
        *row = board.clone();
        row.created_at = created_at;
        Ok(row.clone())
    }

    async fn list_active_boards(&self) -> StrataResult<Vec<Board>> {
        Ok(self.boards().into_iter().filter(|b| b.is_active).collect())
    }

    async fn list_inactive_boards(&self) -> StrataResult<Vec<Board>> {
        Ok(self.boards().into_iter().filter(|b| !b.is_active).collect())
    }

    async fn deactivate_boards(&self, ids: &[Uuid]) -> StrataResult<u64> {
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for board in state.boards.iter_mut() {
            if ids.contains(&board.id) && board.is_active {
                board.is_active = false;
                board.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn set_sprint_count(&self, board_id: Uuid, sprint_count: i32) -> StrataResult<()> {
        let mut state = self.state.lock().unwrap();
        let board = state
            .boards
            .iter_mut()
            .find(|b| b.id == board_id)
            .ok_or_else(|| StrataError::NotFound(format!("board {board_id}")))?;
        board.sprint_count = sprint_count;
        Ok(())
    }

    async fn purge_board_children(&self, board_id: Uuid) -> StrataResult<PurgeCounts> {
        let mut state = self.state.lock().unwrap();
        let doomed: HashSet<Uuid> = state
            .sprints
            .iter()
            .filter(|s| s.board_id == board_id)
            .map(|s| s.id)
            .collect();

        let mut counts = PurgeCounts::default();
        for issue in state.issues.iter_mut() {
            let foreign = issue.board_id != Some(board_id);
            if foreign && issue.sprint_id.is_some_and(|s| doomed.contains(&s)) {
                issue.sprint_id = None;
                counts.issues_unlinked += 1;
            }
        }

        let before = state.issues.len();
        state.issues.retain(|i| i.board_id != Some(board_id));
        counts.issues_deleted = (before - state.issues.len()) as u64;

        let before = state.sprints.len();
        state.sprints.retain(|s| s.board_id != board_id);
        counts.sprints_deleted = (before - state.sprints.len()) as u64;

        Ok(counts)
    }
}

#[async_trait]
impl SprintRepository for MemoryStore {
    async fn find_sprint_by_external_id(&self, external_id: i64) -> StrataResult<Option<Sprint>> {
        Ok(self.sprints().into_iter().find(|s| s.external_id == external_id))
    }

    async fn insert_sprint(&self, sprint: &Sprint) -> StrataResult<Sprint> {
        let mut state = self.state.lock().unwrap();
        if state.sprints.iter().any(|s| s.external_id == sprint.external_id) {
            return Err(StrataError::Conflict("jira_sprints_external_id_key".into()));
        }
        state.sprints.push(sprint.clone());
        Ok(sprint.clone())
    }

    async fn update_sprint(&self, sprint: &Sprint) -> StrataResult<Sprint> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .sprints
            .iter_mut()
            .find(|s| s.id == sprint.id)
            .ok_or_else(|| StrataError::NotFound(format!("sprint {}", sprint.id)))?;
        *row = sprint.clone();
        Ok(row.clone())
    }

    async fn list_sprints_for_board(&self, board_id: Uuid) -> StrataResult<Vec<Sprint>> {
        if self.broken_sprint_lookups.lock().unwrap().contains(&board_id) {
            return Err(StrataError::Database("connection reset".into()));
        }
        Ok(self
            .sprints()
            .into_iter()
            .filter(|s| s.board_id == board_id)
            .collect())
    }

    async fn count_sprints_for_board(&self, board_id: Uuid) -> StrataResult<i64> {
        Ok(self.sprints().iter().filter(|s| s.board_id == board_id).count() as i64)
    }
}

#[async_trait]
impl IssueRepository for MemoryStore {
    async fn find_issue_by_external_id(&self, external_id: i64) -> StrataResult<Option<Issue>> {
        Ok(self.issue(external_id))
    }

    async fn insert_issue(&self, issue: &Issue) -> StrataResult<Issue> {
        let mut state = self.state.lock().unwrap();
        if state.issues.iter().any(|i| i.external_id == issue.external_id) {
            return Err(StrataError::Conflict("jira_issues_external_id_key".into()));
        }
        state.issues.push(issue.clone());
        Ok(issue.clone())
    }

    async fn update_issue(&self, issue: &Issue) -> StrataResult<Issue> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .issues
            .iter_mut()
            .find(|i| i.id == issue.id)
            .ok_or_else(|| StrataError::NotFound(format!("issue {}", issue.id)))?;
        *row = issue.clone();
        Ok(row.clone())
    }
}

#[async_trait]
impl RawPayloadRepository for MemoryStore {
    async fn record_payload(&self, payload: &RawPayload) -> StrataResult<()> {
        if self.fail_payloads.load(Ordering::SeqCst) {
            return Err(StrataError::Database("disk full".into()));
        }
        self.state.lock().unwrap().payloads.push(payload.clone());
        Ok(())
    }
}

/// Records ledger transitions as `(scope, status)` pairs.
#[derive(Default)]
pub struct MemoryLedger {
    runs: Mutex<Vec<SyncRun>>,
    pub transitions: Mutex<Vec<(String, String)>>,
    pub fail_all: AtomicBool,
}

impl MemoryLedger {
    fn transition(&self, id: Uuid, status: &str, message: Option<&str>) -> StrataResult<SyncRun> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StrataError::Database("ledger unavailable".into()));
        }
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StrataError::NotFound(format!("sync run {id}")))?;
        run.status = status.to_string();
        run.last_message = message.map(String::from);
        self.transitions
            .lock()
            .unwrap()
            .push((run.scope.clone(), status.to_string()));
        Ok(run.clone())
    }

    pub fn transitions(&self) -> Vec<(String, String)> {
        self.transitions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncRunRepository for MemoryLedger {
    async fn get_or_create(&self, scope: &str) -> StrataResult<SyncRun> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StrataError::Database("ledger unavailable".into()));
        }
        let mut runs = self.runs.lock().unwrap();
        if let Some(run) = runs.iter().find(|r| r.scope == scope) {
            return Ok(run.clone());
        }
        let now = Utc::now();
        let run = SyncRun {
            id: Uuid::new_v4(),
            scope: scope.to_string(),
            status: "idle".to_string(),
            last_started_at: None,
            last_finished_at: None,
            last_message: None,
            created_at: now,
            updated_at: now,
        };
        runs.push(run.clone());
        Ok(run)
    }

    async fn mark_running(&self, id: Uuid) -> StrataResult<SyncRun> {
        self.transition(id, "running", None)
    }

    async fn mark_completed(&self, id: Uuid, message: &str) -> StrataResult<SyncRun> {
        self.transition(id, "idle", Some(message))
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> StrataResult<SyncRun> {
        self.transition(id, "failed", Some(error_message))
    }
}

/// A remote whose listings are set up by the test and may be changed between runs.
#[derive(Default)]
pub struct ScriptedRemote {
    boards: Mutex<Vec<Value>>,
    sprints: Mutex<HashMap<i64, Vec<Value>>>,
    issues: Mutex<HashMap<i64, Vec<Value>>>,
    configurations: Mutex<HashMap<i64, Value>>,
    /// `(board id, startAt)` issue pages that fail.
    failing_issue_pages: Mutex<HashSet<(i64, usize)>>,
    pub fail_board_pages_from: Mutex<Option<usize>>,
    pub fail_sprints: Mutex<HashSet<i64>>,
    pub sprints_truncated: AtomicBool,
    pub board_calls: AtomicUsize,
    pub sprint_calls: AtomicUsize,
    pub issue_calls: AtomicUsize,
}

impl ScriptedRemote {
    pub fn set_boards(&self, boards: Vec<Value>) {
        *self.boards.lock().unwrap() = boards;
    }

    pub fn set_sprints(&self, board_id: i64, sprints: Vec<Value>) {
        self.sprints.lock().unwrap().insert(board_id, sprints);
    }

    pub fn set_issues(&self, board_id: i64, issues: Vec<Value>) {
        self.issues.lock().unwrap().insert(board_id, issues);
    }

    pub fn set_configuration(&self, board_id: i64, configuration: Value) {
        self.configurations
            .lock()
            .unwrap()
            .insert(board_id, configuration);
    }

    pub fn fail_issue_page(&self, board_id: i64, start_at: usize) {
        self.failing_issue_pages
            .lock()
            .unwrap()
            .insert((board_id, start_at));
    }

    pub fn fail_boards_from(&self, start_at: usize) {
        *self.fail_board_pages_from.lock().unwrap() = Some(start_at);
    }

    pub fn total_calls(&self) -> usize {
        self.board_calls.load(Ordering::SeqCst)
            + self.sprint_calls.load(Ordering::SeqCst)
            + self.issue_calls.load(Ordering::SeqCst)
    }
}

fn slice_page(all: &[Value], start_at: usize, max_results: usize) -> RemotePage {
    let end = (start_at + max_results).min(all.len());
    RemotePage {
        values: all[start_at.min(all.len())..end].to_vec(),
        total: Some(all.len() as u64),
        is_last: Some(end >= all.len()),
    }
}

#[async_trait]
impl RemoteSource for ScriptedRemote {
    async fn list_boards(&self, start_at: usize, max_results: usize) -> Option<RemotePage> {
        self.board_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_board_pages_from
            .lock()
            .unwrap()
            .is_some_and(|from| start_at >= from)
        {
            return None;
        }
        Some(slice_page(&self.boards.lock().unwrap(), start_at, max_results))
    }

    async fn list_sprints(&self, board_id: i64) -> Option<RemotePage> {
        self.sprint_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sprints.lock().unwrap().contains(&board_id) {
            return None;
        }
        let values = self
            .sprints
            .lock()
            .unwrap()
            .get(&board_id)
            .cloned()
            .unwrap_or_default();
        let truncated = self.sprints_truncated.load(Ordering::SeqCst);
        Some(RemotePage {
            total: None,
            is_last: Some(!truncated),
            values,
        })
    }

    async fn list_issues(
        &self,
        board_id: i64,
        start_at: usize,
        max_results: usize,
    ) -> Option<RemotePage> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_issue_pages
            .lock()
            .unwrap()
            .contains(&(board_id, start_at))
        {
            return None;
        }
        let issues = self
            .issues
            .lock()
            .unwrap()
            .get(&board_id)
            .cloned()
            .unwrap_or_default();
        Some(slice_page(&issues, start_at, max_results))
    }

    async fn board_configuration(&self, board_id: i64) -> Option<Value> {
        self.configurations.lock().unwrap().get(&board_id).cloned()
    }

    async fn list_teams(&self) -> Option<RemotePage> {
        Some(RemotePage {
            values: vec![json!({ "id": 1, "title": "Platform" })],
            total: Some(1),
            is_last: Some(true),
        })
    }
}

pub fn board_json(id: i64, name: &str, board_type: &str, project_key: Option<&str>) -> Value {
    match project_key {
        Some(key) => json!({ "id": id, "name": name, "type": board_type, "location": { "projectKey": key } }),
        None => json!({ "id": id, "name": name, "type": board_type }),
    }
}

pub fn sprint_json(id: i64, name: &str, state: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "state": state,
        "startDate": "2026-02-02T09:00:00.000Z",
        "endDate": "2026-02-16T17:00:00.000Z",
        "goal": format!("{name} goal")
    })
}

pub fn issue_json(id: i64, key: &str, sprint_id: Option<i64>) -> Value {
    let sprint_field = match sprint_id {
        Some(sid) => json!([{ "id": sid, "name": format!("Sprint {sid}") }]),
        None => Value::Null,
    };
    json!({
        "id": id.to_string(),
        "key": key,
        "fields": {
            "summary": format!("Issue {key}"),
            "issuetype": { "name": "Story" },
            "status": { "name": "In Progress" },
            "priority": { "name": "Medium" },
            "assignee": { "accountId": "acc-1", "displayName": "Dev One" },
            "reporter": { "accountId": "acc-2", "displayName": "Lead" },
            "labels": ["backend"],
            "components": [{ "name": "api" }],
            "fixVersions": [{ "name": "1.0" }],
            "customfield_10016": 3.0,
            "customfield_10020": sprint_field,
            "timetracking": { "originalEstimateSeconds": 7200, "timeSpentSeconds": 3600 },
            "created": "2026-02-01T10:00:00.000+0000",
            "updated": "2026-02-03T10:00:00.000+0000",
            "duedate": "2026-02-20"
        }
    })
}
