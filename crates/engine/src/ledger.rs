//! Transaction history and decision statistics.

use aegis_core::{Error, Result, TransactionRecord, TxDecision};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::warn;

/// Maximum transaction records kept in memory.
const MAX_TRANSACTION_HISTORY: usize = 5_000;

/// Decision counts. `total == approved + blocked + pending` at every
/// observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    pub approved: u64,
    pub blocked: u64,
    pub pending: u64,
}

impl Stats {
    fn count(&mut self, decision: TxDecision) {
        self.total += 1;
        match decision {
            TxDecision::Approved => self.approved += 1,
            TxDecision::Blocked => self.blocked += 1,
            TxDecision::Pending => self.pending += 1,
        }
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    records: HashMap<String, TransactionRecord>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    stats: Stats,
}

/// Bounded record of evaluated transactions.
///
/// When full, the oldest tenth is dropped, preferring settled records over
/// those still awaiting review. Pending records go only once nothing else
/// is left to drop. Stats count every decision ever rendered and are
/// updated under the same lock as the records.
#[derive(Debug)]
pub struct TransactionLedger {
    inner: Mutex<LedgerInner>,
    capacity: usize,
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::with_capacity(MAX_TRANSACTION_HISTORY)
    }
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LedgerInner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, record: TransactionRecord) {
        let mut inner = self.inner.lock().unwrap();
        if inner.order.len() >= self.capacity {
            self.evict(&mut inner);
        }
        inner.stats.count(record.decision.decision);
        let tx_id = record.tx_id().to_string();
        inner.order.push_back(tx_id.clone());
        inner.records.insert(tx_id, record);
    }

    fn evict(&self, inner: &mut LedgerInner) {
        let mut budget = (self.capacity / 10).max(1);
        let LedgerInner { records, order, .. } = inner;
        order.retain(|tx_id| {
            if budget == 0 {
                return true;
            }
            let keep = records.get(tx_id).is_some_and(|r| r.is_awaiting_review());
            if !keep {
                records.remove(tx_id);
                budget -= 1;
            }
            keep
        });

        // Everything left is awaiting review: drop the oldest of those too.
        while order.len() >= self.capacity {
            let Some(tx_id) = order.pop_front() else { break };
            records.remove(&tx_id);
            warn!(tx_id = %tx_id, "Evicting unreviewed pending transaction");
        }
    }

    pub fn get(&self, tx_id: &str) -> Option<TransactionRecord> {
        self.inner.lock().unwrap().records.get(tx_id).cloned()
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Vec<TransactionRecord> {
        let inner = self.inner.lock().unwrap();
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.records.get(id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> Stats {
        self.inner.lock().unwrap().stats
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` on the record with the ledger locked, so check-and-update
    /// sequences are atomic.
    pub fn update<T>(
        &self,
        tx_id: &str,
        f: impl FnOnce(&mut TransactionRecord) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .records
            .get_mut(tx_id)
            .ok_or_else(|| Error::UnknownTransaction(tx_id.to_string()))?;
        f(record)
    }
}
