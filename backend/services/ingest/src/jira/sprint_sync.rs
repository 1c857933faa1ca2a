use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use strata_common::error::StrataResult;
use strata_db::jira::models::{Board, Sprint, SprintState};
use strata_db::jira::repositories::JiraStore;

use super::audit::record_raw;
use super::models::{parse_optional_timestamp, ApiSprint, MappingError};
use super::source::RemoteSource;
use crate::trigger::SyncResult;

pub struct SprintSynchronizer<R, S> {
    remote: Arc<R>,
    store: Arc<S>,
}

impl<R, S> SprintSynchronizer<R, S>
where
    R: RemoteSource,
    S: JiraStore,
{
    pub fn new(remote: Arc<R>, store: Arc<S>) -> Self {
        Self { remote, store }
    }

    /// Mirror one board's sprints. Boards without sprint support are skipped.
    ///
    /// Failures never propagate: a failed listing or a failed row is logged and counted.
    pub async fn sync_sprints_for_board(&self, board: &Board) -> SyncResult {
        let mut result = SyncResult::new("sprints");

        if !board.has_sprints {
            tracing::debug!(board = board.external_id, "board has no sprints, skipping");
            return result;
        }

        let page = match self.remote.list_sprints(board.external_id).await {
            Some(page) => page,
            None => {
                tracing::warn!(board = board.external_id, "sprint listing unavailable");
                result.errors += 1;
                result.listing_failed = true;
                return result;
            }
        };

        if page.is_last == Some(false) {
            tracing::warn!(
                board = board.external_id,
                fetched = page.values.len(),
                "sprint listing has more pages, only the first is mirrored"
            );
        }

        record_raw(self.store.as_ref(), Some(board.id), "sprints", &page.values).await;

        for raw in &page.values {
            let sprint = match api_sprint_to_db(board.id, raw) {
                Ok(sprint) => sprint,
                Err(e) => {
                    tracing::warn!(board = board.external_id, error = %e, "skipping unmappable sprint");
                    result.skipped += 1;
                    continue;
                }
            };

            match self.upsert_sprint(&sprint).await {
                Ok(_) => result.upserted += 1,
                Err(e) => {
                    tracing::warn!(
                        board = board.external_id,
                        sprint = sprint.external_id,
                        error = %e,
                        "failed to upsert sprint"
                    );
                    result.errors += 1;
                }
            }
        }

        tracing::info!(board = board.external_id, ?result, "jira sprint sync completed");
        result
    }

    async fn upsert_sprint(&self, fetched: &Sprint) -> StrataResult<Sprint> {
        match self
            .store
            .find_sprint_by_external_id(fetched.external_id)
            .await?
        {
            Some(mut existing) => {
                existing.absorb(fetched);
                self.store.update_sprint(&existing).await
            }
            None => self.store.insert_sprint(fetched).await,
        }
    }
}

pub fn api_sprint_to_db(board_id: Uuid, raw: &Value) -> Result<Sprint, MappingError> {
    let api: ApiSprint = serde_json::from_value(raw.clone())?;
    let state: SprintState = api.state.parse().map_err(MappingError::Invalid)?;
    let now = chrono::Utc::now();

    Ok(Sprint {
        id: Uuid::new_v4(),
        external_id: api.id,
        board_id,
        name: api.name,
        state,
        start_date: parse_optional_timestamp(api.start_date.as_deref()),
        end_date: parse_optional_timestamp(api.end_date.as_deref()),
        complete_date: parse_optional_timestamp(api.complete_date.as_deref()),
        goal: api.goal.filter(|g| !g.trim().is_empty()),
        created_at: now,
        updated_at: now,
    })
}
