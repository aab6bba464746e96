//! Report: plain-text reports assembled from the other formatters.

use super::diagram::{family_flowchart, transitions_diagram};
use super::histogram::{generate_histogram, RowValue, RowValues};
use super::summary::{info_rows, item, ttl_rows, TTL_HEADERS};
use super::tree::print_tree;
use super::units::{DurationValue, SizeValue};
use crate::store::Store;
use crate::tx::{RequestAccounting, Tx};
use std::time::Duration;

/// Which half of a transaction's byte counters to plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Received,
    Transmitted,
}

impl Direction {
    fn split(self, acct: &RequestAccounting) -> (u64, u64) {
        match self {
            Direction::Received => (acct.header_bytes_received, acct.body_bytes_received),
            Direction::Transmitted => {
                (acct.header_bytes_transmitted, acct.body_bytes_transmitted)
            }
        }
    }
}

/// Histogram of a transaction's timestamps by time since the previous one.
pub fn timestamp_histogram(tx: &Tx) -> String {
    let rows = tx
        .timestamps
        .iter()
        .map(|ts| RowValue {
            row: vec![ts.label.clone()],
            value: DurationValue(ts.since_last),
        })
        .collect();

    generate_histogram(
        &["Event", "Duration"],
        &RowValues {
            rows,
            total: DurationValue(tx.sum_of_since_last()),
        },
    )
}

fn mark(selected: &str, tx: &Tx) -> String {
    if tx.txid == selected {
        format!("{}*", tx.txid)
    } else {
        tx.txid.clone()
    }
}

/// Total duration of every transaction in `txs`, the selected one marked with `*`.
pub fn all_txs_histogram(selected: &str, txs: &[&Tx]) -> String {
    let mut total = Duration::ZERO;
    let rows = txs
        .iter()
        .map(|tx| {
            let duration = tx.sum_of_since_last();
            total += duration;
            RowValue {
                row: vec![mark(selected, tx), tx.record_type.to_string(), tx.reason.clone()],
                value: DurationValue(duration),
            }
        })
        .collect();

    generate_histogram(
        &["TxId", "Type", "Reason", "Duration"],
        &RowValues { rows, total: DurationValue(total) },
    )
}

/// Header, body and summed bytes per transaction. Sessions carry no counters.
pub fn accounting_histogram(selected: &str, txs: &[&Tx], direction: Direction) -> String {
    let mut total = 0;
    let rows = txs
        .iter()
        .map(|tx| {
            let mut row = vec![mark(selected, tx), tx.record_type.to_string(), tx.reason.clone()];
            if tx.is_session() {
                row.extend(["-".to_string(), "-".to_string()]);
                return RowValue { row, value: SizeValue(0) };
            }
            let (header, body) = direction.split(&tx.accounting);
            total += header + body;
            row.extend([SizeValue(header).to_string(), SizeValue(body).to_string()]);
            RowValue { row, value: SizeValue(header + body) }
        })
        .collect();

    generate_histogram(
        &["TxId", "Type", "Reason", "Header", "Body", "Sum"],
        &RowValues { rows, total: SizeValue(total) },
    )
}

/// Left-aligned columns separated by ` | `.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        format!("{}\n", padded.join(" | ").trim_end())
    };

    let mut out = line(headers.to_vec());
    let sep_len = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    out.push_str(&"-".repeat(sep_len));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}

fn section(out: &mut String, title: &str, body: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.chars().count()));
    out.push('\n');
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
}

fn raw_block(txs: &[&Tx]) -> String {
    raw_export(txs).join("\n")
}

/// Everything known about a single transaction.
pub fn tx_report(tx: &Tx) -> String {
    let mut out = String::new();
    section(&mut out, &format!("Tx {}", tx.txid), &item(tx));

    let info = info_rows(tx);
    if !info.is_empty() {
        let rows: Vec<Vec<String>> = info
            .into_iter()
            .map(|(header, value)| vec![header.to_string(), value])
            .collect();
        section(&mut out, "Info", &render_table(&["Field", "Value"], &rows));
    }

    if !tx.ttl.is_empty() {
        section(&mut out, "TTL", &render_table(&TTL_HEADERS, &ttl_rows(tx)));
    }

    section(&mut out, "Timestamps", timestamp_histogram(tx).trim_start_matches('\n'));

    if !tx.transitions.is_empty() {
        section(&mut out, "VCL Transitions", &transitions_diagram(tx));
    }

    section(&mut out, "Raw log", &raw_block(&[tx]));
    out
}

/// Report over the whole family of `selected`: tree, duration and accounting
/// histograms, flowchart and raw lines. `None` when `selected` is not stored.
pub fn family_report(store: &Store, selected: &str) -> Option<String> {
    let root = store.find_root(selected)?;
    let family = store.family(selected);

    let mut out = String::new();
    section(&mut out, "Txs Tree", &print_tree(store, root, selected));
    section(
        &mut out,
        "Txs Duration",
        all_txs_histogram(selected, &family).trim_start_matches('\n'),
    );
    section(
        &mut out,
        "Txs Received Accounting",
        accounting_histogram(selected, &family, Direction::Received).trim_start_matches('\n'),
    );
    section(
        &mut out,
        "Txs Transmitted Accounting",
        accounting_histogram(selected, &family, Direction::Transmitted)
            .trim_start_matches('\n'),
    );
    section(
        &mut out,
        "Txs Diagram",
        family_flowchart(store, root).trim_start_matches('\n'),
    );
    section(&mut out, "Raw log", &raw_block(&family));
    Some(out)
}

/// Raw lines of every transaction sorted by txid, each block followed by an empty line.
pub fn raw_export(txs: &[&Tx]) -> Vec<String> {
    let mut sorted = txs.to_vec();
    sorted.sort_by(|a, b| a.txid.cmp(&b.txid));

    let mut lines = Vec::new();
    for tx in sorted {
        lines.extend(tx.raw.iter().cloned());
        lines.push(String::new());
    }
    lines
}
