//! Error types for the quintet engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Query has no columns")]
    EmptyColumnList,

    #[error("Term not found: {0}")]
    TermNotFound(i64),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Malformed row from store: {0}")]
    MalformedRow(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Get error code for the HTTP boundary
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::EmptyColumnList => "EMPTY_COLUMN_LIST",
            EngineError::TermNotFound(_) => "TERM_NOT_FOUND",
            EngineError::Store(_) => "STORE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}
