// Transition table: window fingerprint -> successor key -> occurrence count.
//
// Both levels are `BTreeMap` so iteration order, and therefore sampling for
// a given seed, is reproducible across runs and platforms. Counts only ever
// grow from 1, so no zero-weight entry is ever stored.
//
// Tables built from disjoint parts of a corpus combine with `merge`, which
// sums counts pairwise. Merge is commutative and associative, which is what
// lets `ingest::train_parallel` reduce per-piece tables in any order.

use crate::codec::{Fingerprint, SuccessorKey};
use std::collections::BTreeMap;

pub type SuccessorCounts = BTreeMap<SuccessorKey, u32>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTable {
    entries: BTreeMap<Fingerprint, SuccessorCounts>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more observation of `successor` after `fingerprint`.
    pub fn increment(&mut self, fingerprint: Fingerprint, successor: SuccessorKey) {
        *self
            .entries
            .entry(fingerprint)
            .or_default()
            .entry(successor)
            .or_insert(0) += 1;
    }

    pub fn successors(&self, fingerprint: &Fingerprint) -> Option<&SuccessorCounts> {
        self.entries.get(fingerprint)
    }

    /// Fold `other` into `self`, summing counts of matching pairs.
    pub fn merge(&mut self, other: TransitionTable) {
        for (fingerprint, counts) in other.entries {
            let target = self.entries.entry(fingerprint).or_default();
            for (successor, count) in counts {
                *target.entry(successor).or_insert(0) += count;
            }
        }
    }

    /// Number of distinct window fingerprints.
    pub fn fingerprint_count(&self) -> usize {
        self.entries.len()
    }

    /// Sum of every count in the table: the number of recorded transitions.
    pub fn transition_count(&self) -> u64 {
        self.entries
            .values()
            .flat_map(|counts| counts.values())
            .map(|&c| u64::from(c))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &SuccessorCounts)> {
        self.entries.iter()
    }
}
