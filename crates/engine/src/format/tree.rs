//! Tree: ASCII rendering of a transaction family.

use std::collections::HashSet;

use crate::store::Store;
use crate::tx::{LinkState, Tx};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const INDENT: &str = "    ";

/// Render `root` and everything below it, marking `selected` with `*`.
///
/// ```text
/// 1 HTTP/1
/// └── 2* rxreq
///     ├── 3 fetch
///     └── 4_1 esi
/// ```
///
/// Children appear in txid order; a child not yet in the store is shown as
/// `<txid> (unresolved)`.
pub fn print_tree(store: &Store, root: &Tx, selected: &str) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    write_node(store, root, "", None, selected, &mut seen, &mut out);
    out
}

fn write_node<'a>(
    store: &'a Store,
    tx: &'a Tx,
    prefix: &str,
    branch: Option<&str>,
    selected: &str,
    seen: &mut HashSet<&'a str>,
    out: &mut String,
) {
    let marker = if tx.txid == selected { "*" } else { "" };
    if let Some(branch) = branch {
        out.push_str(prefix);
        out.push_str(branch);
    }
    out.push_str(&format!("{}{} {}\n", tx.txid, marker, tx.reason));

    if !seen.insert(tx.txid.as_str()) {
        return;
    }

    // The root's children sit at column zero.
    let child_prefix = match branch {
        Some(_) => format!("{prefix}{INDENT}"),
        None => String::new(),
    };

    let count = tx.children.len();
    for (i, (id, state)) in tx.children.iter().enumerate() {
        let branch = if i + 1 == count { LAST_BRANCH } else { BRANCH };
        match (state, store.get(id)) {
            (LinkState::Resolved, Some(child)) => {
                write_node(store, child, &child_prefix, Some(branch), selected, seen, out);
            }
            _ => out.push_str(&format!("{child_prefix}{branch}{id} (unresolved)\n")),
        }
    }
}
