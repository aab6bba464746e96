//! Presentation formatters over parsed transactions and the store.
//!
//! Everything here is a pure function producing plain text: summaries and
//! filter text, ASCII trees, histograms, Mermaid diagrams and the composed
//! reports. No colors; the viewer decides where the text goes.

pub mod diagram;
pub mod histogram;
pub mod report;
pub mod summary;
pub mod tree;
pub mod units;

pub use diagram::{family_flowchart, transitions_diagram};
pub use histogram::{generate_histogram, RowValue, RowValues, HISTOGRAM_LENGTH};
pub use report::{
    accounting_histogram, all_txs_histogram, family_report, raw_export, render_table,
    timestamp_histogram, tx_report, Direction,
};
pub use summary::{filter_text, info_rows, item, summary, timestamps_flow, ttl_rows};
pub use tree::print_tree;
pub use units::{format_duration, DurationValue, HistValue, SizeValue};
