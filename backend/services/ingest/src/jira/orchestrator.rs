use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use strata_common::error::StrataResult;
use strata_db::jira::models::Board;
use strata_db::jira::repositories::JiraStore;
use strata_db::sync::repositories::SyncRunRepository;

use super::audit::record_raw;
use super::board_sync::BoardSynchronizer;
use super::issue_sync::IssueSynchronizer;
use super::source::RemoteSource;
use super::sprint_sync::SprintSynchronizer;
use crate::trigger::{BoardSyncSummary, SyncSummary, SyncTriggers};

const FULL_SCOPE: &str = "full";
const BOARDS_SCOPE: &str = "boards";

/// Drives boards, then sprints, then issues, then cleanup of inactive boards.
pub struct SyncOrchestrator<R, S, L> {
    remote: Arc<R>,
    store: Arc<S>,
    ledger: L,
    boards: BoardSynchronizer<R, S>,
    sprints: SprintSynchronizer<R, S>,
    issues: IssueSynchronizer<R, S>,
}

impl<R, S, L> SyncOrchestrator<R, S, L>
where
    R: RemoteSource,
    S: JiraStore,
    L: SyncRunRepository,
{
    pub fn new(remote: Arc<R>, store: Arc<S>, ledger: L) -> Self {
        Self {
            boards: BoardSynchronizer::new(remote.clone(), store.clone()),
            sprints: SprintSynchronizer::new(remote.clone(), store.clone()),
            issues: IssueSynchronizer::new(remote.clone(), store.clone()),
            remote,
            store,
            ledger,
        }
    }

    /// Run every phase. Per-board failures are isolated and reported in `failed_boards`;
    /// only a failure outside the per-board loops marks the run unsuccessful.
    pub async fn perform_full_synchronization(&self) -> SyncSummary {
        let started = Instant::now();
        let mut summary = SyncSummary::default();

        if let Err(e) = self.run_phases(&mut summary).await {
            tracing::error!(error = %e, "full synchronization aborted");
            summary.success = false;
            summary.message = format!("Synchronization failed: {e}");
        }

        tracing::info!(
            success = summary.success,
            boards = summary.board_count,
            sprints = summary.sprint_count,
            issues = summary.issue_count,
            failed_boards = summary.failed_boards.len(),
            deactivated = summary.deactivated_boards,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "full synchronization finished"
        );
        summary
    }

    async fn run_phases(&self, summary: &mut SyncSummary) -> StrataResult<()> {
        let boards = self.boards.sync_boards().await?;
        summary.board_count = boards.result.upserted;
        summary.deactivated_boards = boards.deactivated;

        if boards.result.upserted == 0 {
            summary.success = true;
            summary.message = if boards.result.listing_failed {
                "Board listing unavailable, mirror left unchanged".to_string()
            } else {
                "No boards found, nothing to synchronize".to_string()
            };
            return Ok(());
        }

        self.record_teams().await;

        let active = self.store.list_active_boards().await?;
        let mut failed: BTreeSet<i64> = BTreeSet::new();

        for board in active.iter().filter(|b| b.has_sprints) {
            let result = self.sprints.sync_sprints_for_board(board).await;
            summary.sprint_count += result.upserted;
            if result.listing_failed {
                failed.insert(board.external_id);
            }
            if let Err(e) = self.refresh_sprint_count(board).await {
                tracing::error!(board = board.external_id, error = %e, "failed to persist sprint count");
                failed.insert(board.external_id);
            }
        }

        for board in &active {
            match self.issues.sync_issues_for_board(board).await {
                Ok(result) => {
                    summary.issue_count += result.upserted;
                    if result.listing_failed {
                        tracing::warn!(board = board.external_id, "issue listing failed for board");
                        failed.insert(board.external_id);
                    }
                }
                Err(e) => {
                    tracing::error!(board = board.external_id, error = %e, "issue sync failed for board");
                    failed.insert(board.external_id);
                }
            }
        }

        self.cleanup_inactive_boards().await?;

        summary.failed_boards = failed.into_iter().collect();
        summary.success = true;
        summary.message = if summary.failed_boards.is_empty() {
            format!(
                "Synchronized {} boards, {} sprints, {} issues",
                summary.board_count, summary.sprint_count, summary.issue_count
            )
        } else {
            format!(
                "Synchronized {} boards, {} sprints, {} issues; {} boards failed",
                summary.board_count,
                summary.sprint_count,
                summary.issue_count,
                summary.failed_boards.len()
            )
        };
        Ok(())
    }

    /// Board list only, without sprints, issues or cleanup. Returns boards processed.
    pub async fn perform_board_only_synchronization(&self) -> StrataResult<usize> {
        let outcome = self.boards.sync_boards().await?;
        Ok(outcome.result.upserted)
    }

    /// Sprints and issues of one known, active board.
    pub async fn synchronize_board_data(&self, external_board_id: i64) -> BoardSyncSummary {
        let board = match self.store.find_board_by_external_id(external_board_id).await {
            Ok(Some(board)) if board.is_active => board,
            Ok(Some(_)) => {
                return BoardSyncSummary::failed(external_board_id, "Board is inactive");
            }
            Ok(None) => {
                return BoardSyncSummary::failed(
                    external_board_id,
                    "Board not found, run a board sync first",
                );
            }
            Err(e) => {
                return BoardSyncSummary::failed(
                    external_board_id,
                    format!("Board lookup failed: {e}"),
                );
            }
        };

        let mut summary = BoardSyncSummary::failed(external_board_id, "");
        let mut sprint_listing_failed = false;

        if board.has_sprints {
            let result = self.sprints.sync_sprints_for_board(&board).await;
            summary.sprint_count = result.upserted;
            sprint_listing_failed = result.listing_failed;
            if let Err(e) = self.refresh_sprint_count(&board).await {
                tracing::warn!(board = external_board_id, error = %e, "failed to persist sprint count");
            }
        }

        match self.issues.sync_issues_for_board(&board).await {
            Ok(result) => {
                summary.issue_count = result.upserted;
                let failed_listings: Vec<&str> = [
                    ("sprint", sprint_listing_failed),
                    ("issue", result.listing_failed),
                ]
                .into_iter()
                .filter_map(|(name, failed)| failed.then_some(name))
                .collect();
                summary.success = failed_listings.is_empty();
                summary.message = if summary.success {
                    format!(
                        "Synchronized {} sprints and {} issues",
                        summary.sprint_count, summary.issue_count
                    )
                } else {
                    format!(
                        "Synchronized {} sprints and {} issues; {} listing failed",
                        summary.sprint_count,
                        summary.issue_count,
                        failed_listings.join(" and ")
                    )
                };
            }
            Err(e) => {
                tracing::error!(board = external_board_id, error = %e, "board synchronization failed");
                summary.message = format!("Issue synchronization failed: {e}");
            }
        }

        summary
    }

    /// Hard-delete sprints and issues of every inactive board. The board rows stay.
    pub async fn cleanup_inactive_boards(&self) -> StrataResult<()> {
        for board in self.store.list_inactive_boards().await? {
            match self.store.purge_board_children(board.id).await {
                Ok(counts) if counts != Default::default() => tracing::info!(
                    board = board.external_id,
                    issues_deleted = counts.issues_deleted,
                    sprints_deleted = counts.sprints_deleted,
                    issues_unlinked = counts.issues_unlinked,
                    "purged inactive board data"
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    board = board.external_id,
                    error = %e,
                    "failed to purge inactive board data"
                ),
            }
        }
        Ok(())
    }

    async fn refresh_sprint_count(&self, board: &Board) -> StrataResult<()> {
        let count = self.store.count_sprints_for_board(board.id).await?;
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        self.store.set_sprint_count(board.id, count).await
    }

    async fn record_teams(&self) {
        match self.remote.list_teams().await {
            Some(page) => record_raw(self.store.as_ref(), None, "teams", &page.values).await,
            None => tracing::debug!("teams listing unavailable"),
        }
    }

    /// Ledger failures are logged and never stop a run.
    async fn begin_run(&self, scope: &str) -> Option<Uuid> {
        let run = match self.ledger.get_or_create(scope).await {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(scope, error = %e, "sync ledger unavailable");
                return None;
            }
        };
        if run.status == "running" {
            tracing::info!(scope, "previous run still marked running, starting anyway");
        }
        if let Err(e) = self.ledger.mark_running(run.id).await {
            tracing::warn!(scope, error = %e, "failed to mark sync run running");
        }
        Some(run.id)
    }

    async fn finish_run(&self, run: Option<Uuid>, success: bool, message: &str) {
        let Some(id) = run else { return };
        let outcome = if success {
            self.ledger.mark_completed(id, message).await
        } else {
            self.ledger.mark_failed(id, message).await
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "failed to record sync run outcome");
        }
    }
}

#[async_trait]
impl<R, S, L> SyncTriggers for SyncOrchestrator<R, S, L>
where
    R: RemoteSource + 'static,
    S: JiraStore + 'static,
    L: SyncRunRepository + 'static,
{
    async fn run_full_sync(&self) -> SyncSummary {
        let run = self.begin_run(FULL_SCOPE).await;
        let summary = self.perform_full_synchronization().await;
        self.finish_run(run, summary.success, &summary.message).await;
        summary
    }

    async fn run_board_only_sync(&self) -> usize {
        let run = self.begin_run(BOARDS_SCOPE).await;
        match self.perform_board_only_synchronization().await {
            Ok(count) => {
                self.finish_run(run, true, &format!("Synchronized {count} boards"))
                    .await;
                count
            }
            Err(e) => {
                tracing::error!(error = %e, "board-only synchronization failed");
                self.finish_run(run, false, &e.to_string()).await;
                0
            }
        }
    }

    async fn run_sync_for_board(&self, external_board_id: i64) -> BoardSyncSummary {
        let scope = format!("board:{external_board_id}");
        let run = self.begin_run(&scope).await;
        let summary = self.synchronize_board_data(external_board_id).await;
        self.finish_run(run, summary.success, &summary.message).await;
        summary
    }
}
