//! Mailscan crate - Phishing scan engine for a loaded mailbox
//!
//! This crate provides:
//! - Domain models (MessageRecord, Verdict, ScanMode)
//! - Retrieval and classification backend clients behind trait seams
//! - An in-memory message store with a single write gate
//! - Scope selection, scan orchestration and lifecycle tracking
//! - Derived views for presentation consumption
//! - A session facade that ties it all together
//!
//! The engine has no UI dependencies; the `sentinel` binary is one consumer.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod retrieval;
pub mod scan;
pub mod session;
pub mod storage;

pub use backend::{
    Classifier, CredentialGateway, HttpBackend, MessageSource, StaticGateway, TokenBrokerGateway,
    api::HealthResponse,
};
pub use config::ScannerConfig;
pub use error::{RetrievalError, ScanError};
pub use models::{
    CredentialBundle, DisplayFilter, MessageId, MessageRecord, RetrievalParams, RiskLevel,
    ScanMode, SessionId, Verdict,
};
pub use query::ScanSummary;
pub use retrieval::{RetrievalStats, load_inbox};
pub use scan::{
    Busy, FailurePolicy, FanOut, RetrievalState, ScanOptions, ScanOutcome, ScanState, run_scan,
};
pub use session::{ScanReport, ScanSession, SessionError};
pub use storage::MessageStore;
