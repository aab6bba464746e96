//! Store: process-lifetime arena of transactions keyed by txid.
//!
//! Parent and child relationships are identifier references. The result only
//! depends on which transactions are present, not on the order they arrived
//! in: when several parents claim a child, the lexically smallest parent wins.
//!
//! A new txid is linked through an index of claims by child id. Replacing an
//! existing txid recomputes every link from scratch.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::trace;

use crate::tx::{LinkState, Tx};

#[derive(Debug, Default)]
pub struct Store {
    txs: HashMap<String, Tx>,
    /// child txid -> txids whose children list it
    claims: HashMap<String, BTreeSet<String>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a transaction and update the links it takes part in.
    /// Returns the record previously held under the same txid.
    pub fn insert(&mut self, tx: Tx) -> Option<Tx> {
        let txid = tx.txid.clone();
        let previous = self.txs.insert(txid.clone(), tx);
        if previous.is_some() {
            self.relink();
        } else {
            self.link_new(&txid);
        }
        previous
    }

    pub fn get(&self, txid: &str) -> Option<&Tx> {
        self.txs.get(txid)
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.txs.contains_key(txid)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Evict everything.
    pub fn clear(&mut self) {
        self.txs.clear();
        self.claims.clear();
    }

    /// All transactions in lexical txid order.
    pub fn iter_sorted(&self) -> Vec<&Tx> {
        let mut txs: Vec<&Tx> = self.txs.values().collect();
        txs.sort_by(|a, b| a.txid.cmp(&b.txid));
        txs
    }

    /// Transactions without a parent, in lexical txid order.
    pub fn roots(&self) -> Vec<&Tx> {
        self.iter_sorted()
            .into_iter()
            .filter(|tx| tx.parent.is_none())
            .collect()
    }

    /// Follow parent references from `txid` up to a transaction with no parent.
    pub fn find_root(&self, txid: &str) -> Option<&Tx> {
        let mut current = self.txs.get(txid)?;
        let mut seen = HashSet::from([current.txid.as_str()]);

        while let Some(parent) = current.parent.as_deref().and_then(|id| self.txs.get(id)) {
            if !seen.insert(parent.txid.as_str()) {
                break;
            }
            current = parent;
        }

        Some(current)
    }

    /// Every resolved transaction below `txid`, sorted lexically by txid
    /// (so `"10"` comes before `"2"`). The start transaction is not included.
    pub fn descendants(&self, txid: &str) -> Vec<&Tx> {
        let Some(start) = self.txs.get(txid) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start.txid.as_str()]);
        let mut found = Vec::new();
        self.collect_children(start, &mut seen, &mut found);
        found.sort_by(|a, b| a.txid.cmp(&b.txid));
        found
    }

    fn collect_children<'a>(&'a self, tx: &'a Tx, seen: &mut HashSet<&'a str>, found: &mut Vec<&'a Tx>) {
        for id in tx.children.keys() {
            let Some(child) = self.txs.get(id) else { continue };
            if seen.insert(child.txid.as_str()) {
                found.push(child);
                self.collect_children(child, seen, found);
            }
        }
    }

    /// The root of `txid` followed by all of the root's descendants.
    pub fn family(&self, txid: &str) -> Vec<&Tx> {
        let Some(root) = self.find_root(txid) else {
            return Vec::new();
        };
        let mut family = vec![root];
        family.extend(self.descendants(&root.txid));
        family
    }

    /// Link a txid that was not in the store before.
    fn link_new(&mut self, txid: &str) {
        let Some(tx) = self.txs.get_mut(txid) else { return };
        tx.parent = None;
        for state in tx.children.values_mut() {
            *state = LinkState::Pending;
        }
        let children: Vec<String> = tx.children.keys().filter(|c| *c != txid).cloned().collect();

        // As a child: the smallest claimant already present becomes the parent.
        let parent_id = self
            .claims
            .get(txid)
            .and_then(|parents| parents.iter().find(|p| *p != txid))
            .cloned();
        if let Some(parent_id) = parent_id {
            self.attach(&parent_id, txid);
        }

        // As a parent: take over children held by a larger parent id.
        for child_id in children {
            self.claims
                .entry(child_id.clone())
                .or_default()
                .insert(txid.to_string());

            let Some(child) = self.txs.get(&child_id) else { continue };
            match child.parent.clone() {
                None => self.attach(txid, &child_id),
                Some(current) if txid < current.as_str() => {
                    if let Some(old) = self.txs.get_mut(&current) {
                        old.children.insert(child_id.clone(), LinkState::Pending);
                    }
                    self.attach(txid, &child_id);
                }
                Some(current) => {
                    trace!(child = %child_id, parent = %current, "child already linked");
                }
            }
        }
    }

    fn attach(&mut self, parent_id: &str, child_id: &str) {
        if let Some(child) = self.txs.get_mut(child_id) {
            child.parent = Some(parent_id.to_string());
        }
        if let Some(parent) = self.txs.get_mut(parent_id) {
            parent.children.insert(child_id.to_string(), LinkState::Resolved);
        }
    }

    /// Rebuild the claim index and every link from the current arena.
    fn relink(&mut self) {
        let mut edges: Vec<(String, String)> = self
            .txs
            .values()
            .flat_map(|tx| {
                tx.children
                    .keys()
                    .map(move |child| (tx.txid.clone(), child.clone()))
            })
            .collect();
        // Deterministic winner when two parents claim the same child.
        edges.sort();

        self.claims.clear();
        for tx in self.txs.values_mut() {
            tx.parent = None;
            for state in tx.children.values_mut() {
                *state = LinkState::Pending;
            }
        }

        for (parent_id, child_id) in edges {
            if parent_id == child_id {
                continue;
            }
            self.claims
                .entry(child_id.clone())
                .or_default()
                .insert(parent_id.clone());
            let Some(child) = self.txs.get(&child_id) else { continue };
            if child.parent.is_some() {
                trace!(child = %child_id, parent = %parent_id, "child already linked");
                continue;
            }
            self.attach(&parent_id, &child_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_block;

    fn tx(txid: &str, children: &[&str]) -> Tx {
        let mut tx = Tx {
            txid: txid.to_string(),
            ..Default::default()
        };
        for child in children {
            tx.children.insert(child.to_string(), LinkState::Pending);
        }
        tx
    }

    fn snapshot(store: &Store) -> Vec<(String, Option<String>, Vec<(String, LinkState)>)> {
        store
            .iter_sorted()
            .into_iter()
            .map(|tx| {
                (
                    tx.txid.clone(),
                    tx.parent.clone(),
                    tx.children.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_parent_first_then_child() {
        let mut store = Store::new();
        store.insert(tx("1", &["2"]));
        assert_eq!(store.get("1").unwrap().children["2"], LinkState::Pending);

        store.insert(tx("2", &[]));
        assert_eq!(store.get("2").unwrap().parent.as_deref(), Some("1"));
        assert_eq!(store.get("1").unwrap().children["2"], LinkState::Resolved);
    }

    #[test]
    fn test_correlation_is_order_independent() {
        let mut forward = Store::new();
        forward.insert(tx("1", &["2", "3_1"]));
        forward.insert(tx("2", &["4"]));
        forward.insert(tx("3_1", &[]));
        forward.insert(tx("4", &[]));

        let mut backward = Store::new();
        backward.insert(tx("4", &[]));
        backward.insert(tx("3_1", &[]));
        backward.insert(tx("2", &["4"]));
        backward.insert(tx("1", &["2", "3_1"]));

        assert_eq!(snapshot(&forward), snapshot(&backward));
        assert_eq!(forward.get("4").unwrap().parent.as_deref(), Some("2"));
    }

    #[test]
    fn test_replacing_a_parent_drops_stale_links() {
        let mut store = Store::new();
        store.insert(tx("1", &["2"]));
        store.insert(tx("2", &[]));

        let previous = store.insert(tx("1", &[]));
        assert!(previous.is_some());
        assert!(store.get("2").unwrap().parent.is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_find_root() {
        let mut store = Store::new();
        store.insert(tx("1", &["2"]));
        store.insert(tx("2", &["3"]));
        store.insert(tx("3", &[]));

        assert_eq!(store.find_root("3").unwrap().txid, "1");
        assert_eq!(store.find_root("1").unwrap().txid, "1");
        assert!(store.find_root("99").is_none());
    }

    #[test]
    fn test_cycles_terminate() {
        let mut store = Store::new();
        store.insert(tx("a", &["b"]));
        store.insert(tx("b", &["a"]));

        let root = store.find_root("a").unwrap();
        assert!(root.txid == "a" || root.txid == "b");
        assert_eq!(store.descendants("a").len(), 1);
    }

    #[test]
    fn test_descendants_sorted_lexically() {
        let mut store = Store::new();
        store.insert(tx("1", &["2", "10"]));
        store.insert(tx("2", &["3"]));
        store.insert(tx("10", &[]));
        store.insert(tx("3", &[]));

        let ids: Vec<_> = store.descendants("1").iter().map(|t| t.txid.as_str()).collect();
        assert_eq!(ids, vec!["10", "2", "3"]);
    }

    #[test]
    fn test_descendants_skip_unresolved() {
        let mut store = Store::new();
        store.insert(tx("1", &["2", "5"]));
        store.insert(tx("2", &[]));
        let ids: Vec<_> = store.descendants("1").iter().map(|t| t.txid.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn test_family_and_roots() {
        let mut store = Store::new();
        store.insert(tx("1", &["2"]));
        store.insert(tx("2", &["3"]));
        store.insert(tx("3", &[]));
        store.insert(tx("7", &[]));

        let ids: Vec<_> = store.family("3").iter().map(|t| t.txid.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let roots: Vec<_> = store.roots().iter().map(|t| t.txid.as_str()).collect();
        assert_eq!(roots, vec!["1", "7"]);
    }

    #[test]
    fn test_clear() {
        let mut store = Store::new();
        store.insert(tx("1", &[]));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_request_and_backend_blocks_link_both_ways() {
        let request = "*   << Request  >> 8\n-   Begin          req 7 rxreq\n-   Link           bereq 9 fetch\n-   End";
        let backend = "*   << BeReq    >> 9\n-   Begin          bereq 8 fetch\n-   End";
        let parse = |text: &str| parse_block(text.lines().map(String::from).collect()).unwrap();

        for order in [[request, backend], [backend, request]] {
            let mut store = Store::new();
            for text in order {
                store.insert(parse(text));
            }
            assert_eq!(store.get("9").unwrap().parent.as_deref(), Some("8"));
            assert_eq!(store.get("8").unwrap().children["9"], LinkState::Resolved);
        }
    }

    #[test]
    fn test_smallest_parent_wins_in_any_order() {
        let orders: [&[&str]; 3] = [&["5", "3", "9"], &["9", "5", "3"], &["3", "9", "5"]];
        let snapshots: Vec<_> = orders
            .iter()
            .map(|order| {
                let mut store = Store::new();
                for id in order.iter() {
                    match *id {
                        "9" => store.insert(tx("9", &[])),
                        parent => store.insert(tx(parent, &["9"])),
                    };
                }
                assert_eq!(store.get("9").unwrap().parent.as_deref(), Some("3"));
                assert_eq!(store.get("5").unwrap().children["9"], LinkState::Pending);
                snapshot(&store)
            })
            .collect();

        assert_eq!(snapshots[0], snapshots[1]);
        assert_eq!(snapshots[1], snapshots[2]);
    }

    #[test]
    fn test_incremental_links_match_full_rebuild() {
        let mut store = Store::new();
        store.insert(tx("7", &["8", "10"]));
        store.insert(tx("10", &["11"]));
        store.insert(tx("11", &["7"]));
        store.insert(tx("8", &["8"]));
        let incremental = snapshot(&store);

        store.relink();
        assert_eq!(snapshot(&store), incremental);
    }

    #[test]
    fn test_clear_forgets_claims() {
        let mut store = Store::new();
        store.insert(tx("1", &["2"]));
        store.clear();
        store.insert(tx("2", &[]));
        assert!(store.get("2").unwrap().parent.is_none());
    }
}
