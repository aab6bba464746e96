pub mod engine;
pub mod regex;

pub use engine::{FilterEngine, FilterError, FilterMode, FilterStats};
pub use regex::{exclude, include, multi_pattern, Patterns};
