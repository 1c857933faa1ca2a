use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    /// A uniqueness constraint rejected the write (another writer got there first).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StrataError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type StrataResult<T> = Result<T, StrataError>;
