//! Retrieval error types.

use std::time::Duration;

use thiserror::Error;
use viewer_common::ViewerError;

pub type RetrievalResult<T> = Result<T, RetrievalError>;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Retrieval program '{0}' not found")]
    ProgramNotFound(String),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Retrieval exited with {}: {stderr}", exit_label(.status))]
    Failed { status: Option<i32>, stderr: String },

    #[error("Retrieval timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Retrieval cancelled")]
    Cancelled,

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "signal".to_string(),
    }
}

impl From<RetrievalError> for ViewerError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::ProgramNotFound(_) | RetrievalError::Spawn { .. } => {
                ViewerError::RetrievalUnavailable(err.to_string())
            }
            RetrievalError::Failed { .. } => ViewerError::RetrievalFailed(err.to_string()),
            RetrievalError::Timeout(limit) => ViewerError::Timeout(limit.as_secs()),
            RetrievalError::Cancelled => ViewerError::Cancelled,
            RetrievalError::Workspace(e) => ViewerError::InternalError(e.to_string()),
        }
    }
}
