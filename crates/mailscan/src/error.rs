//! Error types for retrieval and scanning

use thiserror::Error;

/// A message retrieval attempt failed
///
/// Always terminal for the attempt: the store is cleared and the
/// retrieval lifecycle moves to `Errored`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// The credential gateway had no token bundle for this session.
    #[error("No credential bundle found for session {session}")]
    NoCredentials { session: String },

    /// Network, DNS or timeout failure before a status was received.
    #[error("Failed to reach retrieval service: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Retrieval service returned status {status}: {reason}")]
    Status { status: u16, reason: String },
}

impl RetrievalError {
    /// HTTP status carried by the error, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A classification request failed
///
/// Every variant collapses to the same fallback in the orchestrator;
/// callers are not required to distinguish them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Network, DNS or timeout failure.
    #[error("Failed to reach classification service: {0}")]
    Transport(String),

    /// The classifier answered with a non-2xx status.
    #[error("Classification service rejected the request with status {status}")]
    Rejected { status: u16 },

    /// A 2xx response whose body could not be decoded.
    #[error("Failed to decode classification response: {0}")]
    Decode(String),
}
