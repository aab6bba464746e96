use std::sync::atomic::{AtomicU64, Ordering};

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::filter_text;
use crate::tx::Tx;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

#[derive(Debug, Default)]
pub struct FilterStats {
    pub txs_scanned: AtomicU64,
    pub txs_matched: AtomicU64,
    pub bytes_processed: AtomicU64,
}

/// Regex filter over the single-line summary of a transaction.
pub struct FilterEngine {
    pattern: String,
    matcher: RegexMatcher,
    mode: FilterMode,
    stats: FilterStats,
}

impl FilterEngine {
    pub fn new(pattern: &str, case_sensitive: bool, mode: FilterMode) -> Result<Self, FilterError> {
        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(!case_sensitive)
            .multi_line(false)
            .build(pattern)
            .map_err(|e| FilterError::InvalidRegex(e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            mode,
            stats: FilterStats::default(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    #[inline]
    pub fn should_include(&self, text: &[u8]) -> bool {
        self.stats.txs_scanned.fetch_add(1, Ordering::Relaxed);
        self.stats.bytes_processed.fetch_add(text.len() as u64, Ordering::Relaxed);

        let matches = self.matcher.is_match(text).unwrap_or(false);

        let include = match self.mode {
            FilterMode::Include => matches,
            FilterMode::Exclude => !matches,
        };

        if include {
            self.stats.txs_matched.fetch_add(1, Ordering::Relaxed);
        }

        include
    }

    /// Match against [`filter_text`] of `tx`.
    pub fn matches_tx(&self, tx: &Tx) -> bool {
        self.should_include(filter_text(tx).as_bytes())
    }

    /// `(scanned, matched, bytes)`
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.txs_scanned.load(Ordering::Relaxed),
            self.stats.txs_matched.load(Ordering::Relaxed),
            self.stats.bytes_processed.load(Ordering::Relaxed),
        )
    }
}
