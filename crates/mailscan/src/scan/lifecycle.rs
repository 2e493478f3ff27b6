//! Retrieval and scan lifecycle tracking
//!
//! Two independent state machines:
//! - Retrieval: `Idle -> Loading -> {Loaded | Errored}`
//! - Scan: `Idle -> Scanning -> Done`
//!
//! Starting a phase while either phase is in flight is refused, which keeps
//! retrieval and scanning mutually exclusive.

use chrono::{DateTime, Utc};
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Progress of the most recent retrieval
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RetrievalState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Retrieval failed; carries the user-visible reason
    Errored(String),
}

impl RetrievalState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Errored(message) => Some(message),
            _ => None,
        }
    }
}

/// Progress of the most recent scan
///
/// `Done` does not distinguish success from failure; failures show up
/// only in the records themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
    Done,
}

impl ScanState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Scanning)
    }
}

/// Which phase refused to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Retrieval,
    Scan,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retrieval => f.write_str("retrieval"),
            Self::Scan => f.write_str("scan"),
        }
    }
}

/// A phase could not start because another one is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cannot start {requested}: a {running} is already in progress")]
pub struct Busy {
    pub requested: Phase,
    pub running: Phase,
}

#[derive(Debug, Default)]
struct Lifecycle {
    retrieval: RetrievalState,
    scan: ScanState,
    last_loaded_at: Option<DateTime<Utc>>,
    last_scanned_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    fn running_phase(&self) -> Option<Phase> {
        if self.retrieval.is_in_flight() {
            Some(Phase::Retrieval)
        } else if self.scan.is_in_flight() {
            Some(Phase::Scan)
        } else {
            None
        }
    }
}

/// Thread-safe tracker for both lifecycles
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    inner: Mutex<Lifecycle>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn retrieval(&self) -> RetrievalState {
        self.lock().retrieval.clone()
    }

    pub fn scan(&self) -> ScanState {
        self.lock().scan
    }

    /// When the last successful retrieval completed
    pub fn last_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.lock().last_loaded_at
    }

    /// When the last scan reached `Done`
    pub fn last_scanned_at(&self) -> Option<DateTime<Utc>> {
        self.lock().last_scanned_at
    }

    /// Restart the retrieval lifecycle and move it to `Loading`
    pub fn begin_retrieval(&self) -> Result<(), Busy> {
        let mut state = self.lock();
        if let Some(running) = state.running_phase() {
            return Err(Busy {
                requested: Phase::Retrieval,
                running,
            });
        }
        // A fresh retrieval restarts from Idle whatever the previous outcome
        debug!("Retrieval: {:?} -> Idle -> Loading", state.retrieval);
        state.retrieval = RetrievalState::Loading;
        Ok(())
    }

    /// Move retrieval to `Loaded`
    pub fn retrieval_succeeded(&self) {
        let mut state = self.lock();
        state.retrieval = RetrievalState::Loaded;
        state.last_loaded_at = Some(Utc::now());
        debug!("Retrieval: Loading -> Loaded");
    }

    /// Move retrieval to `Errored` with a user-visible reason
    pub fn retrieval_failed(&self, message: impl Into<String>) {
        let mut state = self.lock();
        state.retrieval = RetrievalState::Errored(message.into());
        debug!("Retrieval: Loading -> Errored");
    }

    /// Move the scan lifecycle to `Scanning`
    pub fn begin_scan(&self) -> Result<(), Busy> {
        let mut state = self.lock();
        if let Some(running) = state.running_phase() {
            return Err(Busy {
                requested: Phase::Scan,
                running,
            });
        }
        state.scan = ScanState::Scanning;
        debug!("Scan: -> Scanning");
        Ok(())
    }

    /// Move the scan lifecycle to `Done`
    pub fn scan_finished(&self) {
        let mut state = self.lock();
        state.scan = ScanState::Done;
        state.last_scanned_at = Some(Utc::now());
        debug!("Scan: Scanning -> Done");
    }
}
