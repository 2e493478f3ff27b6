//! Seams between the engine and its external collaborators
//!
//! Each trait abstracts one remote service so the engine can be driven
//! by the HTTP client in production and by in-process fakes in tests.

use serde_json::Value;

use super::api::{ClassificationRequest, EmailPayload};
use crate::error::{RetrievalError, ScanError};
use crate::models::{CredentialBundle, RetrievalParams, SessionId, Verdict};

/// Supplies an access-token bundle for an explicit session
pub trait CredentialGateway: Send + Sync {
    fn credentials(&self, session: &SessionId) -> Result<CredentialBundle, RetrievalError>;
}

/// Remote message retrieval service
pub trait MessageSource: Send + Sync {
    /// Issue one retrieval request and return the raw response payload
    ///
    /// The payload is returned undecoded; normalization tolerates any shape.
    fn fetch_messages(
        &self,
        credentials: &CredentialBundle,
        params: &RetrievalParams,
    ) -> Result<Value, RetrievalError>;
}

/// Remote phishing classification service
pub trait Classifier: Send + Sync {
    /// Classify a whole scope in one round trip
    fn classify_batch(&self, request: &ClassificationRequest) -> Result<Vec<Verdict>, ScanError>;

    /// Classify a single email
    fn classify_one(&self, email: &EmailPayload) -> Result<Verdict, ScanError>;
}
