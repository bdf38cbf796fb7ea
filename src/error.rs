use std::{path::PathBuf, time::Duration};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot open index at {path}: {reason}")]
    StorageOpen { path: PathBuf, reason: String },

    #[error("index write failed: {0}")]
    IndexWrite(String),

    #[error("invalid query: {0}")]
    QuerySyntax(String),

    #[error("timed out after {0:?} waiting for index access")]
    LockTimeout(Duration),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("cannot sort on field '{0}'")]
    InvalidSort(String),

    #[error("invalid page request: page numbers start at 1")]
    InvalidPage,

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the caller may retry the whole call unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::IndexWrite(_) | Error::LockTimeout(_))
    }
}
