//! Derived views over a record snapshot
//!
//! Pure projections: recomputed from whatever snapshot is passed in and
//! never cached.

use serde::{Deserialize, Serialize};

use crate::models::{DisplayFilter, MessageRecord};

/// Records flagged as phishing
pub fn phishing(records: &[MessageRecord]) -> Vec<&MessageRecord> {
    records.iter().filter(|r| r.is_flagged()).collect()
}

/// Records not flagged as phishing
pub fn safe(records: &[MessageRecord]) -> Vec<&MessageRecord> {
    records.iter().filter(|r| !r.is_flagged()).collect()
}

/// Records the user selected
pub fn selected(records: &[MessageRecord]) -> Vec<&MessageRecord> {
    records.iter().filter(|r| r.is_selected()).collect()
}

/// Records visible under a display filter
pub fn filtered(records: &[MessageRecord], filter: DisplayFilter) -> Vec<&MessageRecord> {
    match filter {
        DisplayFilter::All => records.iter().collect(),
        DisplayFilter::Phishing => phishing(records),
        DisplayFilter::Safe => safe(records),
        DisplayFilter::Selected => selected(records),
    }
}

/// Aggregate counts shown after a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub phishing: usize,
    pub safe: usize,
    pub selected: usize,
}

impl ScanSummary {
    pub fn from_records(records: &[MessageRecord]) -> Self {
        let phishing = records.iter().filter(|r| r.is_flagged()).count();
        Self {
            total: records.len(),
            phishing,
            safe: records.len() - phishing,
            selected: records.iter().filter(|r| r.is_selected()).count(),
        }
    }

    pub fn has_phishing(&self) -> bool {
        self.phishing > 0
    }
}
