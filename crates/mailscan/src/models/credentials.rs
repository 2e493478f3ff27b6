//! Credential bundle and retrieval parameters

use serde::{Deserialize, Serialize};

/// Identifier of the signed-in user whose mailbox is being scanned
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Access-token bundle passed through to the retrieval service
///
/// The engine never inspects these values; it only forwards them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub access_token: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub token_type: String,
}

impl CredentialBundle {
    /// Token type used for OAuth access tokens
    pub const BEARER: &'static str = "Bearer";

    pub fn bearer(
        access_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_id: user_id.into(),
            token_type: Self::BEARER.to_string(),
        }
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("access_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Parameters controlling which messages the retrieval service returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalParams {
    /// Maximum number of messages to return
    pub max_results: u32,
    /// Folder/label identifiers to search
    pub label_ids: Vec<String>,
    /// Whether spam and trash are included
    pub include_spam_trash: bool,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            max_results: 10,
            label_ids: vec!["INBOX".to_string()],
            include_spam_trash: false,
        }
    }
}
