//! Scan mode, display filter and verdict types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::MessageId;

/// Which records a scan submits to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Every record in the store
    #[default]
    All,
    /// Records not yet flagged (there is no real read/unread signal upstream)
    Unread,
    /// Records the user ticked
    Selected,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Unread => "unread",
            Self::Selected => "selected",
        }
    }

    /// Human-readable description of the scan scope
    pub fn description(&self) -> &'static str {
        match self {
            Self::All => "Scanning all emails in your inbox",
            Self::Unread => "Scanning unread emails only",
            Self::Selected => "Scanning selected emails only",
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "unread" => Ok(Self::Unread),
            "selected" => Ok(Self::Selected),
            other => Err(format!("unknown scan mode: {}", other)),
        }
    }
}

/// Display filter applied to the record list, independent of [`ScanMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFilter {
    #[default]
    All,
    Phishing,
    Safe,
    Selected,
}

impl FromStr for DisplayFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "phishing" => Ok(Self::Phishing),
            "safe" => Ok(Self::Safe),
            "selected" => Ok(Self::Selected),
            other => Err(format!("unknown display filter: {}", other)),
        }
    }
}

/// Classification result for a single message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub id: MessageId,
    /// Score in [0, 100]
    pub risk_score: u8,
    pub is_flagged: bool,
}

impl Verdict {
    pub fn new(id: impl Into<MessageId>, risk_score: u8, is_flagged: bool) -> Self {
        Self {
            id: id.into(),
            risk_score: risk_score.min(100),
            is_flagged,
        }
    }

    /// Build a verdict from a raw classifier score, clamping and rounding it
    pub fn from_raw_score(id: impl Into<MessageId>, score: f64, is_flagged: bool) -> Self {
        let clamped = if score.is_finite() {
            score.round().clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self::new(id, clamped as u8, is_flagged)
    }
}
