//! Scan orchestration
//!
//! Builds the classification request for the active scope, issues it and
//! reconciles the verdicts back into the message store.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::scope::select_scope;
use crate::backend::Classifier;
use crate::backend::api::{ClassificationRequest, EmailPayload};
use crate::error::ScanError;
use crate::models::{ScanMode, Verdict};
use crate::storage::{MergeStats, MessageStore};

/// How a scope is submitted to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    /// One request for the whole scope. Bounds fan-out to a single round
    /// trip; any failure affects the whole scope.
    #[default]
    Batched,
    /// One request per record, issued in parallel. A failed request only
    /// zeroes its own record.
    PerMessage,
}

/// What a failed batched scan does to existing verdicts
///
/// Only consulted under [`FanOut::Batched`]. Under [`FanOut::PerMessage`] a
/// failed request always zeroes its own record, even with `KeepPrevious`;
/// records whose requests succeeded are unaffected either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Zero the score and clear the flag of every record, scoped or not
    #[default]
    ResetAll,
    /// Leave every record as it was before the scan
    KeepPrevious,
}

/// Options controlling scan execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub fan_out: FanOut,
    pub failure_policy: FailurePolicy,
}

/// Result of one scan invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Mode the scope was computed with
    pub mode: ScanMode,
    /// Fan-out policy used
    pub fan_out: FanOut,
    /// Number of records submitted
    pub scope_size: usize,
    /// Number of classification requests issued
    pub requests_sent: usize,
    /// Verdicts merged into the store
    pub merge: MergeStats,
    /// Requests that failed
    pub failed_requests: usize,
    /// Records zeroed by the failure fallback
    pub records_reset: usize,
    /// The failure that triggered the fallback, if any
    pub error: Option<ScanError>,
}

impl ScanOutcome {
    fn new(mode: ScanMode, fan_out: FanOut, scope_size: usize) -> Self {
        Self {
            mode,
            fan_out,
            scope_size,
            requests_sent: 0,
            merge: MergeStats::default(),
            failed_requests: 0,
            records_reset: 0,
            error: None,
        }
    }

    /// Whether every request issued by the scan succeeded
    pub fn succeeded(&self) -> bool {
        self.failed_requests == 0 && self.error.is_none()
    }
}

/// Scan the records selected by `mode` and reconcile the verdicts
///
/// Never fails: classifier errors are absorbed by the fallback described
/// on [`FailurePolicy`] (batched) or by zeroing the affected records
/// (per-message) and reported through the returned outcome.
pub fn run_scan(
    classifier: &dyn Classifier,
    store: &MessageStore,
    mode: ScanMode,
    options: &ScanOptions,
) -> ScanOutcome {
    let request =
        store.with_records(|records| ClassificationRequest::from_records(select_scope(records, mode)));
    let mut outcome = ScanOutcome::new(mode, options.fan_out, request.len());

    if request.is_empty() {
        info!("Scan scope for mode '{}' is empty; nothing to classify", mode.as_str());
        return outcome;
    }

    info!(
        "Scanning {} of {} messages (mode: {}, fan-out: {:?})",
        request.len(),
        store.len(),
        mode.as_str(),
        options.fan_out
    );

    match options.fan_out {
        FanOut::Batched => scan_batched(classifier, store, &request, options, &mut outcome),
        FanOut::PerMessage => scan_per_message(classifier, store, request.emails, &mut outcome),
    }

    info!(
        "Scan finished: {} verdicts applied, {} ignored, {} failed requests",
        outcome.merge.applied, outcome.merge.ignored, outcome.failed_requests
    );
    outcome
}

fn scan_batched(
    classifier: &dyn Classifier,
    store: &MessageStore,
    request: &ClassificationRequest,
    options: &ScanOptions,
    outcome: &mut ScanOutcome,
) {
    outcome.requests_sent = 1;

    match classifier.classify_batch(request) {
        Ok(verdicts) => {
            outcome.merge = store.apply_verdicts(&verdicts);
        }
        Err(err) => {
            warn!("Scan failed: {}", err);
            outcome.failed_requests = 1;
            outcome.records_reset = match options.failure_policy {
                FailurePolicy::ResetAll => store.reset_all_verdicts(),
                FailurePolicy::KeepPrevious => 0,
            };
            outcome.error = Some(err);
        }
    }
}

fn scan_per_message(
    classifier: &dyn Classifier,
    store: &MessageStore,
    emails: Vec<EmailPayload>,
    outcome: &mut ScanOutcome,
) {
    outcome.requests_sent = emails.len();

    // Results may complete in any order; the merge is keyed by id
    let results: Vec<(Verdict, Option<ScanError>)> = emails
        .par_iter()
        .map(|email| match classifier.classify_one(email) {
            Ok(verdict) => (verdict, None),
            Err(err) => {
                warn!("Scan of message {} failed: {}", email.id, err);
                (Verdict::new(email.id.as_str(), 0, false), Some(err))
            }
        })
        .collect();

    let mut verdicts = Vec::with_capacity(results.len());
    for (verdict, err) in results {
        if let Some(err) = err {
            outcome.failed_requests += 1;
            outcome.records_reset += 1;
            outcome.error.get_or_insert(err);
        }
        verdicts.push(verdict);
    }

    outcome.merge = store.apply_verdicts(&verdicts);
}
