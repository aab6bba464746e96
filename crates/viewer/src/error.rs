use engine::capture::CaptureError;
use engine::filter::FilterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Error executing the command: {0}")]
    Capture(#[from] CaptureError),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ViewerResult<T> = Result<T, ViewerError>;
