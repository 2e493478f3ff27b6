//! Credential gateways
//!
//! The engine never acquires tokens itself. A gateway resolves an explicit
//! session identifier into the bundle forwarded to the retrieval service.

use anyhow::Result;
use log::{debug, warn};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::CredentialGateway;
use super::api::BrokerToken;
use super::client::{describe_transport_error, error_reason, parse_base_url};
use crate::error::RetrievalError;
use crate::models::{CredentialBundle, SessionId};

/// Gateway that always returns the same bundle
///
/// Used by the command-line driver when a token is supplied directly.
pub struct StaticGateway {
    bundle: Option<CredentialBundle>,
}

impl StaticGateway {
    pub fn new(bundle: CredentialBundle) -> Self {
        Self {
            bundle: Some(bundle),
        }
    }

    /// A gateway with no credentials; every lookup fails
    pub fn empty() -> Self {
        Self { bundle: None }
    }
}

impl CredentialGateway for StaticGateway {
    fn credentials(&self, session: &SessionId) -> Result<CredentialBundle, RetrievalError> {
        self.bundle
            .clone()
            .ok_or_else(|| RetrievalError::NoCredentials {
                session: session.as_str().to_string(),
            })
    }
}

/// Gateway backed by an identity provider's OAuth token endpoint
///
/// Looks up `GET {broker}/v1/users/{session}/oauth_access_tokens/{provider}`
/// and combines the first returned token with the configured client
/// identity.
pub struct TokenBrokerGateway {
    base_url: Url,
    api_secret: String,
    provider: String,
    client_id: String,
    client_secret: String,
    agent: ureq::Agent,
}

impl TokenBrokerGateway {
    /// OAuth provider key used when none is configured
    pub const DEFAULT_PROVIDER: &'static str = "oauth_google";

    pub fn new(
        broker_url: &str,
        api_secret: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            base_url: parse_base_url(broker_url)?,
            api_secret: api_secret.into(),
            provider: Self::DEFAULT_PROVIDER.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            agent,
        })
    }

    /// Override the OAuth provider key
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    fn token_url(&self, session: &SessionId) -> Result<Url, RetrievalError> {
        let path = format!(
            "v1/users/{}/oauth_access_tokens/{}",
            urlencoding::encode(session.as_str()),
            urlencoding::encode(&self.provider)
        );
        self.base_url
            .join(&path)
            .map_err(|e| RetrievalError::Transport(format!("Invalid token URL: {}", e)))
    }
}

impl CredentialGateway for TokenBrokerGateway {
    fn credentials(&self, session: &SessionId) -> Result<CredentialBundle, RetrievalError> {
        let url = self.token_url(session)?;
        debug!("Resolving credentials for session {}", session.as_str());

        let mut response = self
            .agent
            .get(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_secret))
            .header("Content-Type", "application/json")
            .call()
            .map_err(|e| RetrievalError::Transport(describe_transport_error(&e)))?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap_or_default();
        if !response.status().is_success() {
            return Err(RetrievalError::Status {
                status,
                reason: error_reason(&body, status),
            });
        }

        let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        let token = first_token(&payload).ok_or_else(|| {
            warn!("Token broker returned no tokens for session {}", session.as_str());
            RetrievalError::NoCredentials {
                session: session.as_str().to_string(),
            }
        })?;

        Ok(CredentialBundle::bearer(
            token.token,
            self.client_id.clone(),
            self.client_secret.clone(),
            token.provider_user_id.unwrap_or_default(),
        ))
    }
}

/// First usable token in a broker response, if any
fn first_token(payload: &Value) -> Option<BrokerToken> {
    let first = payload.as_array()?.first()?.clone();
    serde_json::from_value::<BrokerToken>(first)
        .ok()
        .filter(|t| !t.token.is_empty())
}
