//! In-memory message store
//!
//! Holds the ordered record collection for one session. Every mutation
//! (reload, verdict merge, fallback reset, selection toggle) goes through
//! the single write lock, so there is exactly one writer at a time.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{MessageId, MessageRecord, Verdict};

/// Outcome of merging a verdict list into the store
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Records whose score/flag were overwritten
    pub applied: usize,
    /// Verdicts whose id matched no record
    pub ignored: usize,
}

/// Ordered, in-memory collection of message records
pub struct MessageStore {
    records: RwLock<Vec<MessageRecord>>,
}

impl MessageStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<MessageRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<MessageRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole collection, keeping the first record for any repeated id
    ///
    /// Returns the number of records stored.
    pub fn replace_all(&self, records: Vec<MessageRecord>) -> usize {
        let mut seen = HashSet::new();
        let deduped: Vec<MessageRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.id().clone()))
            .collect();

        let mut guard = self.write();
        *guard = deduped;
        guard.len()
    }

    /// Remove every record
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Clone of the current records, in retrieval order
    pub fn snapshot(&self) -> Vec<MessageRecord> {
        self.read().clone()
    }

    /// Run a read-only projection over the current records without cloning them
    pub fn with_records<R>(&self, f: impl FnOnce(&[MessageRecord]) -> R) -> R {
        f(&self.read())
    }

    /// Get a record by ID
    pub fn get(&self, id: &MessageId) -> Option<MessageRecord> {
        self.read().iter().find(|r| r.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Flip the selection flag of one record
    ///
    /// Returns `false` (and changes nothing) when no record has this id.
    pub fn toggle_selection(&self, id: &MessageId) -> bool {
        let mut records = self.write();
        match records.iter_mut().find(|r| r.id() == id) {
            Some(record) => {
                record.toggle_selected();
                true
            }
            None => false,
        }
    }

    /// Overwrite score and flag of every record matched by a verdict
    ///
    /// Records with no verdict are untouched; verdicts for unknown ids are
    /// counted and dropped. If a list repeats an id, its last verdict wins.
    pub(crate) fn apply_verdicts(&self, verdicts: &[Verdict]) -> MergeStats {
        let by_id: HashMap<&MessageId, &Verdict> = verdicts.iter().map(|v| (&v.id, v)).collect();

        let mut records = self.write();
        let mut matched: HashSet<&MessageId> = HashSet::new();
        let mut stats = MergeStats::default();

        for record in records.iter_mut() {
            if let Some(verdict) = by_id.get(record.id()) {
                record.apply_verdict(verdict.risk_score, verdict.is_flagged);
                matched.insert(&verdict.id);
                stats.applied += 1;
            }
        }

        stats.ignored = by_id.len() - matched.len();
        stats
    }

    /// Zero the score and clear the flag of every record
    ///
    /// Returns the number of records reset.
    pub(crate) fn reset_all_verdicts(&self) -> usize {
        let mut records = self.write();
        for record in records.iter_mut() {
            record.reset_verdict();
        }
        records.len()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
