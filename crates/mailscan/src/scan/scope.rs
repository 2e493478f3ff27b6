//! Scan scope selection

use crate::models::{MessageRecord, ScanMode};

/// Records a scan in `mode` submits to the classifier, in retrieval order
///
/// - `All`: every record.
/// - `Unread`: every record that is not flagged. The retrieval service
///   exposes no read/unread signal, so "unread" is approximated as
///   "not yet flagged as phishing". This is a known limitation.
/// - `Selected`: every record the user ticked.
pub fn select_scope(records: &[MessageRecord], mode: ScanMode) -> Vec<&MessageRecord> {
    records.iter().filter(|r| in_scope(r, mode)).collect()
}

/// Whether a single record belongs to the scope of `mode`
pub fn in_scope(record: &MessageRecord, mode: ScanMode) -> bool {
    match mode {
        ScanMode::All => true,
        ScanMode::Unread => !record.is_flagged(),
        ScanMode::Selected => record.is_selected(),
    }
}
