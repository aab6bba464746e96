use std::process::ExitStatus;

use thiserror::Error;

/// Failures that end a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Script is empty after removing comments and blank lines")]
    EmptyScript,

    #[error("Error starting program: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Process {0} pipe unavailable")]
    PipeUnavailable(&'static str),

    #[error("Error reading from stdout: {0}")]
    Read(#[source] std::io::Error),

    #[error("Incomplete tx, stopping ({lines} lines buffered)")]
    IncompleteTx { lines: usize },

    #[error("Error: {status} {stderr}")]
    ProcessFailed { status: ExitStatus, stderr: String },

    #[error("Error waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Capture task failed: {0}")]
    TaskFailed(String),
}
