use std::collections::BTreeSet;

use engine::filter::FilterEngine;
use engine::store::Store;
use engine::tx::Tx;

use crate::config::OutputConfig;
use crate::error::ViewerResult;

/// Everything captured so far plus the active list filter.
pub struct ViewerState {
    pub store: Store,
    filter: Option<FilterEngine>,
    /// Txids that passed the filter when they were recorded.
    shown: BTreeSet<String>,
}

impl ViewerState {
    pub fn new(filter: Option<FilterEngine>) -> Self {
        Self {
            store: Store::new(),
            filter,
            shown: BTreeSet::new(),
        }
    }

    pub fn from_config(output: &OutputConfig) -> ViewerResult<Self> {
        let filter = output
            .filter_pattern()
            .map(|p| FilterEngine::new(p, output.case_sensitive, output.filter_mode))
            .transpose()?;
        Ok(Self::new(filter))
    }

    pub fn filter(&self) -> Option<&FilterEngine> {
        self.filter.as_ref()
    }

    /// Store `tx` and return it back if the filter lets it through.
    ///
    /// The filter sees the transaction once, after it was linked into the store.
    pub fn record(&mut self, tx: Tx) -> Option<&Tx> {
        let txid = tx.txid.clone();
        self.store.insert(tx);
        let stored = self.store.get(&txid)?;

        let visible = self.filter.as_ref().map_or(true, |f| f.matches_tx(stored));
        if visible {
            self.shown.insert(txid);
            Some(stored)
        } else {
            self.shown.remove(&txid);
            None
        }
    }

    /// Visible transactions in txid order.
    pub fn visible(&self) -> Vec<&Tx> {
        self.shown.iter().filter_map(|id| self.store.get(id)).collect()
    }

    /// Root txids of every family holding at least one visible transaction.
    pub fn visible_roots(&self) -> Vec<String> {
        self.visible()
            .into_iter()
            .filter_map(|tx| self.store.find_root(&tx.txid))
            .map(|root| root.txid.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
