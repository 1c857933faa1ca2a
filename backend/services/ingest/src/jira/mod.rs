pub mod audit;
pub mod board_sync;
pub mod client;
pub mod issue_sync;
pub mod models;
pub mod orchestrator;
pub mod paginate;
pub mod project_key;
pub mod source;
pub mod sprint_ref;
pub mod sprint_sync;

#[cfg(test)]
pub mod testing;
