//! Scan backend integration
//!
//! This module provides:
//! - The seams the engine talks through (credential gateway, message source, classifier)
//! - A blocking HTTP client for the retrieval and classification services
//! - Response normalization to [`MessageRecord`](crate::models::MessageRecord)s

mod client;
mod gateway;
mod normalize;
mod traits;

pub use client::HttpBackend;
pub use gateway::{StaticGateway, TokenBrokerGateway};
pub use normalize::{normalize_message, normalize_payload};
pub use traits::{Classifier, CredentialGateway, MessageSource};

/// Check that `raw` is an absolute http(s) URL usable as a service root
pub fn validate_service_url(raw: &str) -> anyhow::Result<()> {
    client::parse_base_url(raw).map(|_| ())
}

/// Wire types exchanged with the backend services
pub mod api {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize};

    use crate::models::{CredentialBundle, MessageRecord, RetrievalParams};

    /// Body of `POST /get-messages/`
    #[derive(Debug, Serialize)]
    pub struct RetrievalRequest<'a> {
        pub token: TokenEnvelope<'a>,
    }

    /// Credential bundle plus retrieval parameters
    #[derive(Debug, Serialize)]
    pub struct TokenEnvelope<'a> {
        pub token: &'a CredentialBundle,
        #[serde(flatten)]
        pub params: &'a RetrievalParams,
    }

    impl<'a> RetrievalRequest<'a> {
        pub fn new(credentials: &'a CredentialBundle, params: &'a RetrievalParams) -> Self {
            Self {
                token: TokenEnvelope {
                    token: credentials,
                    params,
                },
            }
        }
    }

    /// Fields the classifier scores a single email on
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct EmailFields {
        pub body: String,
        pub subject: String,
        /// Comma-joined URL list (empty string when there are none)
        pub urls: String,
        pub sender: String,
    }

    /// One email inside a batched classification request
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct EmailPayload {
        pub id: String,
        #[serde(flatten)]
        pub fields: EmailFields,
    }

    impl From<&MessageRecord> for EmailPayload {
        fn from(record: &MessageRecord) -> Self {
            Self {
                id: record.id().as_str().to_string(),
                fields: EmailFields {
                    body: record.full_body.clone(),
                    subject: record.subject.clone(),
                    urls: record.joined_urls(),
                    sender: record.sender_address.clone(),
                },
            }
        }
    }

    /// Body of the batched `POST /check-phishing`
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ClassificationRequest {
        pub emails: Vec<EmailPayload>,
    }

    impl ClassificationRequest {
        pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MessageRecord>) -> Self {
            Self {
                emails: records.into_iter().map(EmailPayload::from).collect(),
            }
        }

        pub fn is_empty(&self) -> bool {
            self.emails.is_empty()
        }

        pub fn len(&self) -> usize {
            self.emails.len()
        }
    }

    /// One entry of the batched classification response
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct VerdictResponse {
        /// Echoed message id; numeric ids are accepted like on retrieval
        #[serde(deserialize_with = "message_id")]
        pub id: String,
        pub phishing_score: f64,
        pub is_phishing: bool,
    }

    fn message_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        super::normalize::id_text(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid message id: {}", raw)))
    }

    /// Response to a single-email classification
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SingleVerdictResponse {
        pub phishing_score: f64,
        pub is_phishing: bool,
    }

    /// Response from `GET /health`
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    pub struct HealthResponse {
        pub status: String,
        #[serde(default)]
        pub service: String,
    }

    /// Error body returned by the backend on failure
    #[derive(Debug, Deserialize)]
    pub struct ErrorResponse {
        pub error: String,
    }

    /// One entry returned by the token broker
    #[derive(Debug, Deserialize)]
    pub struct BrokerToken {
        pub token: String,
        #[serde(default)]
        pub provider_user_id: Option<String>,
    }
}
