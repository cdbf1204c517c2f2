//! Error types for the forecast overlay viewer.

use thiserror::Error;

/// Result type alias using ViewerError.
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Primary error type surfaced to the page.
#[derive(Debug, Error)]
pub enum ViewerError {
    // === Request Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session limit of {0} reached")]
    TooManySessions(usize),

    #[error("Layer position {position} is out of range 1..={count}")]
    PositionOutOfRange { position: usize, count: usize },

    // === Artifact Errors ===
    #[error("No GeoTIFF files found for '{0}'")]
    NoArtifacts(String),

    #[error("Invalid raster '{name}': {message}")]
    InvalidArtifact { name: String, message: String },

    // === Retrieval Errors ===
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("Retrieval collaborator unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("A retrieval is already running for this session")]
    RetrievalBusy,

    #[error("Retrieval cancelled")]
    Cancelled,

    #[error("Retrieval timed out after {0} seconds")]
    Timeout(u64),

    // === Infrastructure Errors ===
    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ViewerError {
    /// Short machine readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ViewerError::InvalidParameter { .. } => "InvalidParameterValue",
            ViewerError::SessionNotFound(_) => "SessionNotFound",
            ViewerError::TooManySessions(_) => "TooManySessions",
            ViewerError::PositionOutOfRange { .. } => "PositionOutOfRange",
            ViewerError::NoArtifacts(_) => "NoArtifacts",
            ViewerError::InvalidArtifact { .. } => "InvalidArtifact",
            ViewerError::RetrievalFailed(_) => "RetrievalFailed",
            ViewerError::RetrievalUnavailable(_) => "RetrievalUnavailable",
            ViewerError::RetrievalBusy => "RetrievalBusy",
            ViewerError::Cancelled => "Cancelled",
            ViewerError::Timeout(_) => "Timeout",
            ViewerError::RenderError(_) | ViewerError::InternalError(_) => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ViewerError::InvalidParameter { .. } => 400,

            ViewerError::SessionNotFound(_)
            | ViewerError::PositionOutOfRange { .. }
            | ViewerError::NoArtifacts(_) => 404,

            ViewerError::RetrievalBusy | ViewerError::Cancelled => 409,
            ViewerError::InvalidArtifact { .. } => 422,
            ViewerError::RetrievalFailed(_) => 502,
            ViewerError::RetrievalUnavailable(_) | ViewerError::TooManySessions(_) => 503,
            ViewerError::Timeout(_) => 504,

            _ => 500,
        }
    }

    pub fn invalid_parameter(param: &str, message: impl Into<String>) -> Self {
        ViewerError::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        ViewerError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::InternalError(format!("JSON error: {}", err))
    }
}
