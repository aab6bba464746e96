//! Capture: subprocess stream driver.
//!
//! - `script.rs`: script normalization and the shell command line
//! - `framer.rs`: block boundary detection
//! - `driver.rs`: producer task, stderr drain, cancellation, terminal outcome
//! - `error.rs`: stream-fatal errors

pub mod driver;
pub mod error;
pub mod framer;
pub mod script;

pub use driver::{spawn_capture, CaptureEvent, CaptureHandle, CaptureOutcome, CaptureStats};
pub use error::CaptureError;
pub use framer::BlockFramer;
pub use script::normalize_script;
