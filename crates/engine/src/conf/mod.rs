//! Conf module: capture configuration model.

pub mod model;

pub use model::CaptureConfig;
