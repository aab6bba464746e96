//! Regex: preset transaction filters and composition helpers.
//!
//! Presets match against the single-line summary, e.g.
//! `124 bereq 123 fetch (200 OK) GET www.example.com/index.html`.

use crate::filter::engine::{FilterEngine, FilterError, FilterMode};

/// Well-known transaction patterns for quick filtering.
pub struct Patterns;

impl Patterns {
    /// Server errors: the status code opening the parenthesized status.
    pub const HTTP_5XX: &'static str = r"\(5\d{2}\b";

    /// Client errors.
    pub const HTTP_4XX: &'static str = r"\(4\d{2}\b";

    /// ESI sub-requests.
    pub const ESI: &'static str = r"^\S+ req \S+ esi\b";

    /// Backend fetches, foreground and background.
    pub const FETCH: &'static str = r"^\S+ bereq \S+ (?:fetch|bgfetch)\b";

    /// Backend requests made for a pass.
    pub const PASS: &'static str = r"^\S+ bereq \S+ pass\b";

    /// Client sessions.
    pub const SESSION: &'static str = r"^\S+ sess\b";

    /// Resolve a preset by its short name.
    pub fn by_name(name: &str) -> Option<&'static str> {
        match name.to_ascii_lowercase().as_str() {
            "5xx" => Some(Self::HTTP_5XX),
            "4xx" => Some(Self::HTTP_4XX),
            "esi" => Some(Self::ESI),
            "fetch" => Some(Self::FETCH),
            "pass" => Some(Self::PASS),
            "session" | "sess" => Some(Self::SESSION),
            _ => None,
        }
    }
}

/// Build a [`FilterEngine`] that matches **any** of the given patterns.
///
/// The patterns are joined into one alternation so a single compiled
/// matcher is evaluated per transaction.
///
/// ```rust,ignore
/// let filter = multi_pattern(&[Patterns::HTTP_5XX, Patterns::PASS], FilterMode::Include)?;
/// ```
pub fn multi_pattern(patterns: &[&str], mode: FilterMode) -> Result<FilterEngine, FilterError> {
    if patterns.is_empty() {
        return Err(FilterError::InvalidRegex("at least one pattern required".into()));
    }
    let combined = if patterns.len() == 1 {
        patterns[0].to_string()
    } else {
        patterns.iter().map(|p| format!("(?:{p})")).collect::<Vec<_>>().join("|")
    };
    FilterEngine::new(&combined, false, mode)
}

/// Convenience: build an include-mode filter from a single pattern.
pub fn include(pattern: &str) -> Result<FilterEngine, FilterError> {
    FilterEngine::new(pattern, false, FilterMode::Include)
}

/// Convenience: build an exclude-mode filter from a single pattern.
pub fn exclude(pattern: &str) -> Result<FilterEngine, FilterError> {
    FilterEngine::new(pattern, false, FilterMode::Exclude)
}
