//! Scan engine
//!
//! Scope selection, classification orchestration and lifecycle tracking.

mod lifecycle;
mod orchestrator;
mod scope;
mod timing;

pub use lifecycle::{Busy, LifecycleTracker, Phase, RetrievalState, ScanState};
pub use orchestrator::{FailurePolicy, FanOut, ScanOptions, ScanOutcome, run_scan};
pub use scope::{in_scope, select_scope};
pub use timing::{settle, settle_remaining};
