//! Retrieval response normalization
//!
//! Converts the retrieval service's raw JSON payload to MessageRecords.
//! Normalization never fails: anything that is not the expected shape
//! degrades to fewer (or zero) records.

use log::warn;
use serde_json::Value;
use std::collections::HashSet;

use crate::models::{MessageId, MessageRecord};

/// Normalize a whole `{ "messages": [...] }` payload
///
/// Non-object payloads, a missing or non-list `messages` field, and
/// entries without a usable id all normalize to nothing. Repeated ids keep
/// their first occurrence so the store never holds duplicates.
pub fn normalize_payload(payload: &Value) -> Vec<MessageRecord> {
    let Some(raw_messages) = payload.get("messages").and_then(Value::as_array) else {
        if !payload.is_null() {
            warn!("Retrieval payload has no message list; treating as empty");
        }
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw_messages.len());

    for raw in raw_messages {
        match normalize_message(raw) {
            Some(record) => {
                if seen.insert(record.id().clone()) {
                    records.push(record);
                } else {
                    warn!("Skipping duplicate message {}", record.id());
                }
            }
            None => warn!("Skipping retrieved message without an id"),
        }
    }

    records
}

/// Normalize a single raw message object
///
/// Returns `None` when the entry has no string or numeric `id`.
pub fn normalize_message(raw: &Value) -> Option<MessageRecord> {
    let id = extract_id(raw)?;

    let mut builder = MessageRecord::builder(id)
        .sender_address(string_field(raw, "sender_email"))
        .subject(string_field(raw, "subject"))
        .body(string_field(raw, "body"))
        .urls(extract_urls(raw));

    let sender_name = string_field(raw, "sender_name");
    if !sender_name.is_empty() {
        builder = builder.sender_name(sender_name);
    }

    Some(builder.build())
}

fn extract_id(raw: &Value) -> Option<MessageId> {
    raw.get("id").and_then(id_text).map(MessageId::new)
}

/// Text form of a message id given as a non-empty string or a number
pub(crate) fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A string field, or empty when absent or not a string
fn string_field(raw: &Value, name: &str) -> String {
    raw.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// URL list, skipping any non-string entries
fn extract_urls(raw: &Value) -> Vec<String> {
    raw.get("urls")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
