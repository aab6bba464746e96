//! Block parsing for varnishlog transaction output.
//!
//! # Architecture
//!
//! - `extract.rs`: pure field extractors (epoch times, durations, TTL, accounting)
//! - `line.rs`: one decoded variant per recognized tag
//! - `block.rs`: folds the lines of one block into a [`crate::tx::Tx`]
//! - `model.rs`: error types
//!
//! # Failure policy
//!
//! - A bad header vxid drops the block ([`ParseError`])
//! - Any other malformed field is logged at debug and skipped ([`ExtractError`])
//! - Lines whose shape does not match their tag are ignored

pub mod block;
pub mod extract;
pub mod line;
pub mod model;

pub use block::parse_block;
pub use line::{Side, VslLine};
pub use model::{ExtractError, ParseError};

/// Second field of the line that closes a block.
pub const END_TAG: &str = "End";

/// Value given to empty method/host/url fields of a session.
pub const SESSION_PLACEHOLDER: &str = "-";

/// Host shown for a session whose log buffer overflowed.
pub const OVERFLOW_HOST: &str = "store overflow";

/// Outcome recorded for a `VCL_call` that never saw its `VCL_return`.
pub const UNTERMINATED_RETURN: &str = "-";

/// Fractional digits of an epoch time (nanosecond precision).
pub const FRACTION_DIGITS: usize = 9;
