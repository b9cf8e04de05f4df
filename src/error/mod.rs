use std::path::PathBuf;

/// Failures of the threshold transform itself
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CompressError {
    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),
}

/// Failures reading or writing image files
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Unable to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Unable to encode {path:?}: {reason}")]
    Encode { path: PathBuf, reason: String },
}

/// Errors surfaced to the user at the boundary of an action. None of them
/// are fatal; the user re-triggers the action.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No image selected. Please select an image first!")]
    NoImageSelected,

    #[error("{0}")]
    DecodeError(String),

    #[error("{0}")]
    InvalidBuffer(String),

    #[error("{0}")]
    EncodeError(String),

    #[error("Processing failed: {0}")]
    ProcessingError(String),

    #[error("A compression is already running")]
    Busy,
}

pub type AppResult<T> = Result<T, AppError>;

impl From<CompressError> for AppError {
    fn from(error: CompressError) -> Self {
        match error {
            CompressError::InvalidBuffer(_) => AppError::InvalidBuffer(error.to_string()),
        }
    }
}

impl From<SourceError> for AppError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::Decode { .. } => AppError::DecodeError(error.to_string()),
            SourceError::Encode { .. } => AppError::EncodeError(error.to_string()),
        }
    }
}
