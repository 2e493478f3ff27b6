//! Domain models for the scan engine

mod credentials;
mod message;
mod scan;

pub use credentials::{CredentialBundle, RetrievalParams, SessionId};
pub use message::{
    MessageId, MessageRecord, MessageRecordBuilder, PREVIEW_CHARS, RiskLevel, UNKNOWN_SENDER,
    preview_of,
};
pub use scan::{DisplayFilter, ScanMode, Verdict};
