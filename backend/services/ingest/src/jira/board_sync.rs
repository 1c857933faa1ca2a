use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use strata_common::error::{StrataError, StrataResult};
use strata_db::jira::models::{Board, BoardType};
use strata_db::jira::repositories::JiraStore;

use super::audit::record_raw;
use super::models::{ApiBoard, MappingError};
use super::paginate::{fetch_all, PageLimits, StopReason};
use super::project_key::resolve_project_key;
use super::source::RemoteSource;
use crate::trigger::SyncResult;

#[derive(Debug)]
pub struct BoardSyncOutcome {
    pub result: SyncResult,
    pub deactivated: u64,
    /// The listing ran to its natural end; only then is deactivation applied.
    pub listing_complete: bool,
}

/// Mirrors the board list and deactivates boards that disappeared remotely.
pub struct BoardSynchronizer<R, S> {
    remote: Arc<R>,
    store: Arc<S>,
    limits: PageLimits,
}

impl<R, S> BoardSynchronizer<R, S>
where
    R: RemoteSource,
    S: JiraStore,
{
    pub fn new(remote: Arc<R>, store: Arc<S>) -> Self {
        Self {
            remote,
            store,
            limits: PageLimits::BOARDS,
        }
    }

    #[cfg(test)]
    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub async fn sync_boards(&self) -> StrataResult<BoardSyncOutcome> {
        let remote: &R = &self.remote;
        let listing = fetch_all("boards", self.limits, move |start_at, max_results| {
            remote.list_boards(start_at, max_results)
        })
        .await;

        tracing::info!(
            boards = listing.items.len(),
            pages = listing.pages_fetched,
            stop = ?listing.stop_reason,
            "fetched jira boards"
        );
        if listing.pages_fetched > 0 {
            record_raw(self.store.as_ref(), None, "boards", &listing.items).await;
        }

        let mut result = SyncResult::new("boards");
        result.listing_failed = listing.stop_reason == StopReason::FetchFailed;
        let mut seen: HashSet<i64> = HashSet::new();

        for raw in &listing.items {
            if let Some(external_id) = raw.get("id").and_then(raw_id) {
                seen.insert(external_id);
            }

            let board = match api_board_to_db(raw) {
                Ok(board) => board,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unmappable board");
                    result.skipped += 1;
                    continue;
                }
            };

            match self.upsert_board(board).await {
                Ok(_) => result.upserted += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to upsert board");
                    result.errors += 1;
                }
            }
        }

        let listing_complete = listing.stop_reason.is_complete();
        let deactivated = if listing_complete {
            self.deactivate_missing(&seen).await?
        } else {
            tracing::warn!(
                stop = ?listing.stop_reason,
                "board listing incomplete, skipping deactivation"
            );
            0
        };

        tracing::info!(?result, deactivated, "jira board sync completed");

        Ok(BoardSyncOutcome {
            result,
            deactivated,
            listing_complete,
        })
    }

    async fn upsert_board(&self, fetched: Board) -> StrataResult<Board> {
        if let Some(existing) = self
            .store
            .find_board_by_external_id(fetched.external_id)
            .await?
        {
            return self.merge_into(existing, &fetched).await;
        }

        match self.store.insert_board(&fetched).await {
            Ok(board) => {
                tracing::debug!(external_id = board.external_id, name = %board.name, "created board");
                Ok(board)
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!(
                    external_id = fetched.external_id,
                    "board inserted concurrently, updating instead"
                );
                let existing = self
                    .store
                    .find_board_by_external_id(fetched.external_id)
                    .await?
                    .ok_or_else(|| {
                        StrataError::NotFound(format!("board {}", fetched.external_id))
                    })?;
                self.merge_into(existing, &fetched).await
            }
            Err(e) => Err(e),
        }
    }

    async fn merge_into(&self, mut existing: Board, fetched: &Board) -> StrataResult<Board> {
        if existing.absorb(fetched) {
            tracing::info!(external_id = existing.external_id, "board reappeared, reactivating");
        }
        self.store.update_board(&existing).await
    }

    async fn deactivate_missing(&self, seen: &HashSet<i64>) -> StrataResult<u64> {
        let missing: Vec<Board> = self
            .store
            .list_active_boards()
            .await?
            .into_iter()
            .filter(|b| !seen.contains(&b.external_id))
            .collect();

        if missing.is_empty() {
            return Ok(0);
        }

        for board in &missing {
            tracing::info!(
                external_id = board.external_id,
                name = %board.name,
                "board no longer listed remotely, deactivating"
            );
        }

        let ids: Vec<_> = missing.iter().map(|b| b.id).collect();
        self.store.deactivate_boards(&ids).await
    }
}

fn raw_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn api_board_to_db(raw: &Value) -> Result<Board, MappingError> {
    let api: ApiBoard = serde_json::from_value(raw.clone())?;
    let board_type: BoardType = api.board_type.parse().map_err(MappingError::Invalid)?;
    let project_key = resolve_project_key(api.location.as_ref(), &api.name);
    Ok(Board::new(api.id, api.name, project_key, board_type))
}
