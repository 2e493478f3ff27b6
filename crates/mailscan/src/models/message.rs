//! Message record model tracked by the scan engine

use serde::{Deserialize, Serialize};

/// Number of characters kept in a record's body preview
pub const PREVIEW_CHARS: usize = 100;

/// Sender name used when upstream supplies neither a name nor an address
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Opaque identifier for a retrieved message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse risk bucket used for colouring scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower bound (inclusive) of the medium tier
    pub const MEDIUM_THRESHOLD: u8 = 40;
    /// Lower bound (inclusive) of the high tier
    pub const HIGH_THRESHOLD: u8 = 70;

    pub fn from_score(score: u8) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            Self::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One retrieved email plus its classification state
///
/// The identifier, score and flag are read-only outside the crate: only
/// the scan orchestrator writes verdicts, and only the message store
/// flips selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    id: MessageId,
    /// Display name of the sender ("Unknown" when upstream had none)
    pub sender_display_name: String,
    /// Sender's email address (may be empty)
    pub sender_address: String,
    /// Subject line (may be empty)
    pub subject: String,
    /// First [`PREVIEW_CHARS`] characters of the body, fixed at ingestion
    pub body_preview: String,
    /// Complete decoded body
    pub full_body: String,
    /// URLs extracted upstream, in order of appearance
    pub urls: Vec<String>,
    risk_score: u8,
    is_flagged: bool,
    is_selected: bool,
}

impl MessageRecord {
    /// Create a new record builder
    pub fn builder(id: MessageId) -> MessageRecordBuilder {
        MessageRecordBuilder::new(id)
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Phishing score in [0, 100]; 0 until scanned
    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    /// Whether the classifier flagged this message as phishing
    pub fn is_flagged(&self) -> bool {
        self.is_flagged
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }

    /// URLs flattened the way the classifier expects them
    pub fn joined_urls(&self) -> String {
        self.urls.join(",")
    }

    pub(crate) fn apply_verdict(&mut self, risk_score: u8, is_flagged: bool) {
        self.risk_score = risk_score.min(100);
        self.is_flagged = is_flagged;
    }

    pub(crate) fn reset_verdict(&mut self) {
        self.apply_verdict(0, false);
    }

    pub(crate) fn toggle_selected(&mut self) {
        self.is_selected = !self.is_selected;
    }
}

/// Truncate a body to its preview prefix, counting characters rather than bytes
pub fn preview_of(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

/// Builder for creating MessageRecord instances
///
/// New records always start unscored, unflagged and unselected.
pub struct MessageRecordBuilder {
    id: MessageId,
    sender_display_name: Option<String>,
    sender_address: String,
    subject: String,
    full_body: String,
    urls: Vec<String>,
}

impl MessageRecordBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            sender_display_name: None,
            sender_address: String::new(),
            subject: String::new(),
            full_body: String::new(),
            urls: Vec::new(),
        }
    }

    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_display_name = Some(name.into());
        self
    }

    pub fn sender_address(mut self, address: impl Into<String>) -> Self {
        self.sender_address = address.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.full_body = body.into();
        self
    }

    pub fn urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn build(self) -> MessageRecord {
        let sender_display_name = self
            .sender_display_name
            .filter(|name| !name.is_empty())
            .or_else(|| Some(self.sender_address.clone()).filter(|addr| !addr.is_empty()))
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

        MessageRecord {
            id: self.id,
            sender_display_name,
            sender_address: self.sender_address,
            subject: self.subject,
            body_preview: preview_of(&self.full_body),
            full_body: self.full_body,
            urls: self.urls,
            risk_score: 0,
            is_flagged: false,
            is_selected: false,
        }
    }
}
