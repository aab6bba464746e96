//! Diagram: Mermaid text for transaction families and policy transitions.

use std::collections::{BTreeMap, BTreeSet};

use crate::format::units::format_duration;
use crate::store::Store;
use crate::tx::{RecordType, Tx};

fn fill(record_type: &RecordType) -> &'static str {
    match record_type {
        RecordType::Session => "#fafce6",
        RecordType::Request => "#fcf2e6",
        _ => "#fce7e6",
    }
}

/// Flowchart of `root` and its resolved descendants: one subgraph per
/// transaction holding its timestamp chain, one edge per parent link.
pub fn family_flowchart(store: &Store, root: &Tx) -> String {
    let mut subgraphs = BTreeMap::new();
    let mut edges = BTreeSet::new();

    subgraphs.insert(root.txid.as_str(), subgraph(root));
    for tx in store.descendants(&root.txid) {
        subgraphs.insert(tx.txid.as_str(), subgraph(tx));
        if let Some(parent) = tx.parent_id() {
            edges.insert(format!("    {parent}== \"{}\" ==>{}", tx.reason, tx.txid));
        }
    }

    let mut s = String::from("\nflowchart TD\n");
    for sub in subgraphs.values() {
        s.push_str(sub);
        s.push('\n');
    }
    for edge in &edges {
        s.push_str(edge);
        s.push('\n');
    }
    s
}

fn subgraph(tx: &Tx) -> String {
    let id = &tx.txid;
    let mut events = Vec::with_capacity(tx.timestamps.len());
    let mut event_styles = String::new();

    for (i, ts) in tx.timestamps.iter().enumerate() {
        let node = format!("{}_{}_{}", ts.label, i, id);
        events.push(format!("{node}({}\n{})", ts.label, format_duration(ts.since_last)));
        event_styles.push_str(&format!(
            "    style {node} fill:#fafafa,color:#333333,stroke:#111111,stroke-width:1px;\n"
        ));
    }

    format!(
        "subgraph {id}[\"`&nbsp;**{id} {}**&nbsp;\n`\"]\n    direction LR\n    {}\n    end\n{}\n    style {id} fill:{},stroke:#666666,stroke-width:1px\n",
        tx.record_type,
        events.join("-->"),
        event_styles,
        fill(&tx.record_type),
    )
}

/// State diagram of the policy calls of `tx`, ending in `[*]`.
/// Empty for sessions and for transactions without transitions.
pub fn transitions_diagram(tx: &Tx) -> String {
    let Some(last) = tx.transitions.last() else {
        return String::new();
    };
    if tx.is_session() {
        return String::new();
    }

    let mut s = String::from("stateDiagram\ndirection LR\n");
    for pair in tx.transitions.windows(2) {
        s.push_str(&format!("{} --> {}: <em>{}</em>\n", pair[0].call, pair[1].call, pair[0].outcome));
    }
    s.push_str(&format!("{} --> [*]: <em>{}</em>\n", last.call, last.outcome));
    s
}
