use async_trait::async_trait;
use serde::Serialize;

/// Counts from one synchronizer pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub entity: &'static str,
    pub upserted: usize,
    pub skipped: usize,
    pub errors: usize,
    /// The remote listing failed, so the pass mirrored at most part of the data.
    pub listing_failed: bool,
}

impl SyncResult {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            upserted: 0,
            skipped: 0,
            errors: 0,
            listing_failed: false,
        }
    }
}

/// Outcome of a full synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub success: bool,
    pub message: String,
    pub board_count: usize,
    pub sprint_count: usize,
    pub issue_count: usize,
    /// External ids of boards whose sprint or issue step failed, at the remote or in the store.
    pub failed_boards: Vec<i64>,
    pub deactivated_boards: u64,
}

/// Outcome of a single-board synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSyncSummary {
    pub success: bool,
    pub message: String,
    pub board_id: i64,
    pub sprint_count: usize,
    pub issue_count: usize,
}

impl BoardSyncSummary {
    pub fn failed(board_id: i64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            board_id,
            sprint_count: 0,
            issue_count: 0,
        }
    }
}

/// Entry points invoked by the scheduler and the CLI.
#[async_trait]
pub trait SyncTriggers: Send + Sync {
    async fn run_full_sync(&self) -> SyncSummary;

    /// Refresh board metadata only. Returns the number of boards processed.
    async fn run_board_only_sync(&self) -> usize;

    async fn run_sync_for_board(&self, external_board_id: i64) -> BoardSyncSummary;
}
