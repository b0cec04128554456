use std::collections::{HashSet, VecDeque};

use crate::model::Identity;

/// Every identity ever handed to the oracle, newest first, capped at
/// `capacity`. Identities pushed past the cap are forgotten and may be
/// scored again by a later run.
#[derive(Debug, Clone)]
pub struct SeenLedger {
    order: VecDeque<Identity>,
    index: HashSet<Identity>,
    capacity: usize,
}

impl SeenLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            index: HashSet::new(),
            capacity,
        }
    }

    /// Rebuild from a persisted snapshot (newest first). Repeats keep their
    /// first position; anything beyond capacity is dropped.
    pub fn from_snapshot(identities: Vec<Identity>, capacity: usize) -> Self {
        let mut ledger = Self::new(capacity);
        for identity in identities {
            if ledger.index.insert(identity.clone()) {
                ledger.order.push_back(identity);
            }
        }
        ledger.evict();
        ledger
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains(identity)
    }

    /// Prepend a run's batch, keeping its internal order, then evict from the
    /// tail down to capacity.
    pub fn record_batch(&mut self, batch: Vec<Identity>) {
        let mut fresh = Vec::with_capacity(batch.len());
        for identity in batch {
            if self.index.insert(identity.clone()) {
                fresh.push(identity);
            }
        }
        for identity in fresh.into_iter().rev() {
            self.order.push_front(identity);
        }
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Identities newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.order.iter()
    }

    fn evict(&mut self) {
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_back() {
                self.index.remove(&oldest);
            }
        }
    }
}
