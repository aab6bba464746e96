//! End-of-capture output: family reports and raw export.

use std::io::{self, Write};
use std::path::Path;

use engine::format::{family_report, raw_export, tx_report};
use tracing::{debug, info};

use crate::state::ViewerState;

/// One family report per visible tree, in root txid order.
pub fn write_reports<W: Write>(state: &ViewerState, out: &mut W) -> io::Result<usize> {
    let roots = state.visible_roots();
    for root in &roots {
        let Some(report) = family_report(&state.store, root) else {
            debug!(root = %root, "family vanished before reporting");
            continue;
        };
        writeln!(out, "{report}")?;
    }
    Ok(roots.len())
}

/// Detailed report of one transaction, shown or not. `false` when `txid` was never captured.
pub fn write_tx_report<W: Write>(state: &ViewerState, txid: &str, out: &mut W) -> io::Result<bool> {
    let Some(tx) = state.store.get(txid) else {
        return Ok(false);
    };
    writeln!(out, "{}", tx_report(tx))?;
    Ok(true)
}

/// Write the raw lines of every visible transaction to `path`.
/// Returns the number of exported transactions.
pub fn export_raw(state: &ViewerState, path: &Path) -> io::Result<usize> {
    let txs = state.visible();
    let mut text = raw_export(&txs).join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path, text)?;
    info!(path = %path.display(), txs = txs.len(), "raw log exported");
    Ok(txs.len())
}
