//! Backend HTTP client
//!
//! Talks to the retrieval and classification services over JSON.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::debug;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::api::{
    ClassificationRequest, EmailPayload, ErrorResponse, HealthResponse, RetrievalRequest,
    SingleVerdictResponse, VerdictResponse,
};
use super::{Classifier, MessageSource};
use crate::error::{RetrievalError, ScanError};
use crate::models::{CredentialBundle, RetrievalParams, Verdict};

/// Blocking client for the scan backend
///
/// Every request carries the configured timeout; expiry is reported as a
/// transport failure.
pub struct HttpBackend {
    base_url: Url,
    agent: ureq::Agent,
}

impl HttpBackend {
    const MESSAGES_PATH: &'static str = "get-messages/";
    const CLASSIFY_PATH: &'static str = "check-phishing";
    const HEALTH_PATH: &'static str = "health";

    /// Create a client rooted at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Backend root, e.g. `http://localhost:5000`
    /// * `timeout` - Upper bound for each whole request
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        // Statuses are inspected by hand so error bodies stay readable
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self { base_url, agent })
    }

    fn endpoint(&self, path: &str) -> Url {
        // Join cannot fail for the fixed relative paths above
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    /// Query the backend's health endpoint
    pub fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint(Self::HEALTH_PATH);
        let mut response = self
            .agent
            .get(url.as_str())
            .call()
            .context("Failed to send health request")?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            anyhow::bail!("Health check returned status {}", status);
        }

        response
            .body_mut()
            .read_json()
            .context("Failed to parse health response")
    }
}

impl MessageSource for HttpBackend {
    fn fetch_messages(
        &self,
        credentials: &CredentialBundle,
        params: &RetrievalParams,
    ) -> Result<Value, RetrievalError> {
        let url = self.endpoint(Self::MESSAGES_PATH);
        debug!(
            "POST {} (maxResults={}, labels={:?})",
            url, params.max_results, params.label_ids
        );

        let mut response = self
            .agent
            .post(url.as_str())
            .send_json(RetrievalRequest::new(credentials, params))
            .map_err(|e| RetrievalError::Transport(describe_transport_error(&e)))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(RetrievalError::Status {
                status,
                reason: error_reason(&body, status),
            });
        }

        // An unparseable success body is treated as an empty message list
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RetrievalError::Transport(describe_transport_error(&e)))?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}

impl Classifier for HttpBackend {
    fn classify_batch(&self, request: &ClassificationRequest) -> Result<Vec<Verdict>, ScanError> {
        let url = self.endpoint(Self::CLASSIFY_PATH);
        debug!("POST {} ({} emails)", url, request.len());

        let mut response = self
            .agent
            .post(url.as_str())
            .send_json(request)
            .map_err(|e| ScanError::Transport(describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(ScanError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let verdicts: Vec<VerdictResponse> = response
            .body_mut()
            .read_json()
            .map_err(|e| ScanError::Decode(e.to_string()))?;

        Ok(verdicts
            .into_iter()
            .map(|v| Verdict::from_raw_score(v.id, v.phishing_score, v.is_phishing))
            .collect())
    }

    fn classify_one(&self, email: &EmailPayload) -> Result<Verdict, ScanError> {
        let url = self.endpoint(Self::CLASSIFY_PATH);
        debug!("POST {} (message {})", url, email.id);

        let mut response = self
            .agent
            .post(url.as_str())
            .send_json(&email.fields)
            .map_err(|e| ScanError::Transport(describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(ScanError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let verdict: SingleVerdictResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| ScanError::Decode(e.to_string()))?;

        Ok(Verdict::from_raw_score(
            email.id.as_str(),
            verdict.phishing_score,
            verdict.is_phishing,
        ))
    }
}

/// Parse a service root, forcing a trailing slash so relative joins append
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized).with_context(|| format!("Invalid service URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Unsupported URL scheme '{}' in {}", url.scheme(), raw);
    }
    Ok(url)
}

/// Human-readable description of a failure that produced no status
pub(crate) fn describe_transport_error(err: &ureq::Error) -> String {
    match err {
        ureq::Error::Timeout(_) => "request timed out".to_string(),
        other => other.to_string(),
    }
}

/// Extract the reason from an `{"error": ...}` body, falling back to the status
pub(crate) fn error_reason(body: &str, status: u16) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .ok()
        .filter(|reason| !reason.trim().is_empty())
        .unwrap_or_else(|| format!("Failed to fetch emails (HTTP {})", status))
}
