//! Scan session facade
//!
//! Ties the store, lifecycle tracker and backend seams together behind the
//! operations a presentation layer needs: load, choose a mode, select
//! records, scan and read the results.

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::backend::{Classifier, CredentialGateway, MessageSource};
use crate::config::ScannerConfig;
use crate::error::RetrievalError;
use crate::models::{DisplayFilter, MessageId, MessageRecord, RetrievalParams, ScanMode, SessionId};
use crate::query::{self, ScanSummary};
use crate::retrieval::{RetrievalStats, load_inbox};
use crate::scan::{
    Busy, LifecycleTracker, RetrievalState, ScanOptions, ScanOutcome, ScanState, run_scan, settle,
};
use crate::storage::MessageStore;

/// A session operation failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Another retrieval or scan is still running
    #[error(transparent)]
    Busy(#[from] Busy),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// What a completed scan did, plus the resulting counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub summary: ScanSummary,
    pub completed_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn mode(&self) -> ScanMode {
        self.outcome.mode
    }

    pub fn scope_size(&self) -> usize {
        self.outcome.scope_size
    }

    pub fn verdicts_applied(&self) -> usize {
        self.outcome.merge.applied
    }

    pub fn verdicts_ignored(&self) -> usize {
        self.outcome.merge.ignored
    }

    /// Whether any classification request failed and records were zeroed or kept
    pub fn fallback_fired(&self) -> bool {
        !self.outcome.succeeded()
    }
}

/// One user's scanning session
///
/// All methods take `&self`; the session can be shared across threads
/// behind an `Arc`. Retrieval and scanning are mutually exclusive: starting
/// one while the other runs returns [`SessionError::Busy`].
pub struct ScanSession {
    gateway: Arc<dyn CredentialGateway>,
    source: Arc<dyn MessageSource>,
    classifier: Arc<dyn Classifier>,
    store: MessageStore,
    lifecycle: LifecycleTracker,
    params: RetrievalParams,
    options: ScanOptions,
    settle_floor: Duration,
    mode: RwLock<ScanMode>,
}

impl ScanSession {
    /// Create a session with default retrieval parameters and scan options
    pub fn new(
        gateway: Arc<dyn CredentialGateway>,
        source: Arc<dyn MessageSource>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            gateway,
            source,
            classifier,
            store: MessageStore::new(),
            lifecycle: LifecycleTracker::new(),
            params: RetrievalParams::default(),
            options: ScanOptions::default(),
            settle_floor: Duration::ZERO,
            mode: RwLock::new(ScanMode::default()),
        }
    }

    /// Create a session using the retrieval, scan and settle settings from `config`
    pub fn from_config(
        config: &ScannerConfig,
        gateway: Arc<dyn CredentialGateway>,
        source: Arc<dyn MessageSource>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self::new(gateway, source, classifier)
            .with_params(config.retrieval.clone())
            .with_options(config.scan_options())
            .with_settle_floor(config.settle_floor())
    }

    pub fn with_params(mut self, params: RetrievalParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Minimum time `scan` keeps the lifecycle in `Scanning`
    pub fn with_settle_floor(mut self, floor: Duration) -> Self {
        self.settle_floor = floor;
        self
    }

    /// Load the mailbox for `session`, replacing every record
    ///
    /// On failure the store is emptied and the retrieval lifecycle carries
    /// the error message.
    pub fn load(&self, session: &SessionId) -> Result<RetrievalStats, SessionError> {
        self.lifecycle.begin_retrieval()?;

        match load_inbox(
            self.gateway.as_ref(),
            self.source.as_ref(),
            &self.store,
            session,
            &self.params,
        ) {
            Ok(stats) => {
                self.lifecycle.retrieval_succeeded();
                Ok(stats)
            }
            Err(err) => {
                self.lifecycle.retrieval_failed(err.to_string());
                Err(err.into())
            }
        }
    }

    pub fn mode(&self) -> ScanMode {
        *self.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the scope used by the next scan
    pub fn set_mode(&self, mode: ScanMode) {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
        info!("Scan mode set to '{}'", mode.as_str());
    }

    /// Flip the selection of a record; returns whether a record was found
    pub fn toggle_selection(&self, id: &MessageId) -> bool {
        self.store.toggle_selection(id)
    }

    /// Classify the current scope and merge the verdicts
    ///
    /// Classifier failures never surface as errors; they are absorbed by
    /// the configured failure policy and reported in the [`ScanReport`].
    pub fn scan(&self) -> Result<ScanReport, SessionError> {
        self.lifecycle.begin_scan()?;
        let started = Instant::now();

        let outcome = run_scan(
            self.classifier.as_ref(),
            &self.store,
            self.mode(),
            &self.options,
        );
        if let Some(err) = &outcome.error {
            warn!("Scan fell back after classifier failure: {}", err);
        }

        settle(started, self.settle_floor);
        self.lifecycle.scan_finished();

        let report = ScanReport {
            summary: self.summary(),
            completed_at: self.lifecycle.last_scanned_at().unwrap_or_else(Utc::now),
            outcome,
        };
        info!(
            "Scan complete: {} of {} flagged",
            report.summary.phishing, report.summary.total
        );
        Ok(report)
    }

    pub fn records(&self) -> Vec<MessageRecord> {
        self.store.snapshot()
    }

    pub fn record(&self, id: &MessageId) -> Option<MessageRecord> {
        self.store.get(id)
    }

    /// Records visible under `filter`, in retrieval order
    pub fn filtered(&self, filter: DisplayFilter) -> Vec<MessageRecord> {
        self.store
            .with_records(|records| query::filtered(records, filter).into_iter().cloned().collect())
    }

    pub fn phishing(&self) -> Vec<MessageRecord> {
        self.filtered(DisplayFilter::Phishing)
    }

    pub fn summary(&self) -> ScanSummary {
        self.store.with_records(ScanSummary::from_records)
    }

    pub fn retrieval_state(&self) -> RetrievalState {
        self.lifecycle.retrieval()
    }

    pub fn scan_state(&self) -> ScanState {
        self.lifecycle.scan()
    }

    pub fn last_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.last_loaded_at()
    }
}
