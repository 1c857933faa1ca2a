use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use strata_common::error::StrataResult;
use strata_db::jira::models::{Board, BoardType, Issue};
use strata_db::jira::repositories::JiraStore;

use super::audit::record_raw;
use super::models::{parse_optional_timestamp, ApiIssue, ApiNamed, MappingError};
use super::paginate::{fetch_all, PageLimits, StopReason};
use super::source::RemoteSource;
use super::sprint_ref::resolve_sprint_id;
use crate::trigger::SyncResult;

/// Estimation fields tried when the board configuration does not name one.
pub const DEFAULT_STORY_POINT_FIELDS: [&str; 5] = [
    "customfield_10016",
    "customfield_10026",
    "customfield_10002",
    "customfield_10004",
    "story_points",
];

/// An issue row plus the remote sprint id it referenced, before local linking.
#[derive(Debug, Clone)]
pub struct MappedIssue {
    pub issue: Issue,
    pub remote_sprint_id: Option<i64>,
}

/// Convert an API issue to a DB issue row. `sprint_id` is left for the caller to resolve.
pub fn api_issue_to_db(
    board_id: Uuid,
    raw: &Value,
    story_point_fields: &[String],
) -> Result<MappedIssue, MappingError> {
    let api: ApiIssue = serde_json::from_value(raw.clone())?;
    let f = &api.fields;
    let now = Utc::now();
    let (original, remaining, spent) = f.time_tracking();
    let names = |items: &[ApiNamed]| -> Vec<String> {
        items.iter().filter_map(|i| i.name.clone()).collect()
    };

    let issue = Issue {
        id: Uuid::new_v4(),
        external_id: api.id,
        issue_key: api.key.clone(),
        board_id: Some(board_id),
        sprint_id: None,
        issue_type: f.issuetype.as_ref().and_then(|t| t.name.clone()),
        status: f.status.as_ref().and_then(|s| s.name.clone()),
        priority: f.priority.as_ref().and_then(|p| p.name.clone()),
        assignee_account_id: f.assignee.as_ref().and_then(|a| a.id()),
        assignee_name: f.assignee.as_ref().and_then(|a| a.display_name.clone()),
        reporter_account_id: f.reporter.as_ref().and_then(|r| r.id()),
        reporter_name: f.reporter.as_ref().and_then(|r| r.display_name.clone()),
        summary: f.summary.clone(),
        description: f.description_text(),
        story_points: f.story_points(story_point_fields),
        original_estimate_secs: original,
        remaining_estimate_secs: remaining,
        time_spent_secs: spent,
        created_at_jira: parse_optional_timestamp(f.created.as_deref()),
        updated_at_jira: parse_optional_timestamp(f.updated.as_deref()),
        resolved_at: parse_optional_timestamp(f.resolutiondate.as_deref()),
        due_at: parse_optional_timestamp(f.duedate.as_deref()),
        labels: f.labels.clone(),
        components: names(&f.components),
        fix_versions: names(&f.fix_versions),
        created_at: now,
        updated_at: now,
    };

    Ok(MappedIssue {
        issue,
        remote_sprint_id: resolve_sprint_id(&f.extra),
    })
}

/// Estimation field named by the board configuration, ahead of the defaults.
pub fn story_point_fields(configuration: Option<&Value>) -> Vec<String> {
    let configured = configuration
        .and_then(|c| c.pointer("/estimation/field/fieldId"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut fields: Vec<String> = configured.into_iter().collect();
    for default in DEFAULT_STORY_POINT_FIELDS {
        if !fields.iter().any(|f| f == default) {
            fields.push(default.to_string());
        }
    }
    fields
}

pub struct IssueSynchronizer<R, S> {
    remote: Arc<R>,
    store: Arc<S>,
    limits: PageLimits,
}

impl<R, S> IssueSynchronizer<R, S>
where
    R: RemoteSource,
    S: JiraStore,
{
    pub fn new(remote: Arc<R>, store: Arc<S>) -> Self {
        Self {
            remote,
            store,
            limits: PageLimits::ISSUES,
        }
    }

    #[cfg(test)]
    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Mirror every issue on one board.
    ///
    /// Kanban boards and boards without sprint support never link issues to sprints. An
    /// error here means the board's issue step could not run at all; per-issue failures
    /// are counted in the result instead.
    pub async fn sync_issues_for_board(&self, board: &Board) -> StrataResult<SyncResult> {
        let link_sprints = board.has_sprints && board.board_type != BoardType::Kanban;
        let sprint_index: HashMap<i64, Uuid> = if link_sprints {
            self.store
                .list_sprints_for_board(board.id)
                .await?
                .into_iter()
                .map(|s| (s.external_id, s.id))
                .collect()
        } else {
            HashMap::new()
        };

        let configuration = self.remote.board_configuration(board.external_id).await;
        let estimation_fields = story_point_fields(configuration.as_ref());

        let remote: &R = &self.remote;
        let board_external_id = board.external_id;
        let listing = fetch_all("issues", self.limits, move |start_at, max_results| {
            remote.list_issues(board_external_id, start_at, max_results)
        })
        .await;

        tracing::info!(
            board = board.external_id,
            issues = listing.items.len(),
            pages = listing.pages_fetched,
            stop = ?listing.stop_reason,
            "fetched jira issues"
        );
        if listing.pages_fetched > 0 {
            record_raw(self.store.as_ref(), Some(board.id), "issues", &listing.items).await;
        }

        let mut result = SyncResult::new("issues");
        result.listing_failed = listing.stop_reason == StopReason::FetchFailed;

        for raw in &listing.items {
            let MappedIssue {
                mut issue,
                remote_sprint_id,
            } = match api_issue_to_db(board.id, raw, &estimation_fields) {
                Ok(mapped) => mapped,
                Err(e) => {
                    tracing::warn!(board = board.external_id, error = %e, "skipping unmappable issue");
                    result.skipped += 1;
                    continue;
                }
            };

            if link_sprints {
                if let Some(remote_sprint) = remote_sprint_id {
                    issue.sprint_id = self.local_sprint(&sprint_index, remote_sprint).await;
                }
            }

            match self.upsert_issue(&issue).await {
                Ok(_) => result.upserted += 1,
                Err(e) => {
                    tracing::warn!(
                        board = board.external_id,
                        issue = %issue.issue_key,
                        error = %e,
                        "failed to upsert issue"
                    );
                    result.errors += 1;
                }
            }
        }

        tracing::info!(board = board.external_id, ?result, "jira issue sync completed");
        Ok(result)
    }

    /// Sprints of the board first, then any mirrored sprint (issues can sit in another
    /// board's sprint). Unknown sprints leave the issue unlinked.
    async fn local_sprint(&self, index: &HashMap<i64, Uuid>, remote_sprint: i64) -> Option<Uuid> {
        if let Some(id) = index.get(&remote_sprint) {
            return Some(*id);
        }
        match self.store.find_sprint_by_external_id(remote_sprint).await {
            Ok(found) => found.map(|s| s.id),
            Err(e) => {
                tracing::warn!(sprint = remote_sprint, error = %e, "sprint lookup failed");
                None
            }
        }
    }

    async fn upsert_issue(&self, fetched: &Issue) -> StrataResult<Issue> {
        match self
            .store
            .find_issue_by_external_id(fetched.external_id)
            .await?
        {
            Some(mut existing) => {
                existing.absorb(fetched);
                self.store.update_issue(&existing).await
            }
            None => self.store.insert_issue(fetched).await,
        }
    }
}
