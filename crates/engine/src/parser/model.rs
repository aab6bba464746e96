use thiserror::Error;

/// Failure that drops a whole block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Block has no header line")]
    MissingHeader,

    #[error("Invalid vxid in header: {0}")]
    InvalidVxid(String),
}

/// Failure of a single field or sub-record. Never escapes the block parser.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid {field}: {value}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("Invalid epoch time: {0}")]
    InvalidTime(String),

    #[error("Epoch time out of range: {0}")]
    TimeOutOfRange(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Negative or non-finite duration: {0}")]
    DurationOutOfRange(String),

    #[error("Unexpected TTL shape: {0} fields (expected 6 or 10)")]
    TtlShape(usize),

    #[error("Unexpected accounting shape: {0} fields (expected 6)")]
    AccountingShape(usize),
}
