//! Inbox retrieval

use log::{info, warn};
use std::time::Instant;

use crate::backend::{CredentialGateway, MessageSource, normalize_payload};
use crate::error::RetrievalError;
use crate::models::{RetrievalParams, SessionId};
use crate::storage::MessageStore;

/// Statistics from a retrieval
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetrievalStats {
    /// Entries in the raw payload's message list
    pub messages_received: usize,
    /// Records now in the store
    pub records_stored: usize,
    /// Entries dropped during normalization (no id, or a repeated id)
    pub messages_skipped: usize,
    /// Duration of the retrieval
    pub duration_ms: u64,
}

/// Load the inbox for `session` into `store`
///
/// Resolves credentials, issues one retrieval request and replaces the
/// store's contents with the normalized records. Running it twice against
/// the same upstream data yields the same store.
///
/// On any failure the store is cleared rather than left stale.
///
/// # Arguments
/// * `gateway` - Resolves the session's credential bundle
/// * `source` - Retrieval service
/// * `store` - Store to replace
/// * `session` - Whose mailbox to load
/// * `params` - Result cap, labels and spam/trash inclusion
pub fn load_inbox(
    gateway: &dyn CredentialGateway,
    source: &dyn MessageSource,
    store: &MessageStore,
    session: &SessionId,
    params: &RetrievalParams,
) -> Result<RetrievalStats, RetrievalError> {
    let start = Instant::now();

    let payload = match gateway
        .credentials(session)
        .and_then(|credentials| source.fetch_messages(&credentials, params))
    {
        Ok(payload) => payload,
        Err(err) => {
            warn!("Retrieval failed for session {}: {}", session.as_str(), err);
            store.clear();
            return Err(err);
        }
    };

    let messages_received = payload
        .get("messages")
        .and_then(|m| m.as_array())
        .map_or(0, |m| m.len());
    let records = normalize_payload(&payload);
    let normalized = records.len();
    let records_stored = store.replace_all(records);

    let stats = RetrievalStats {
        messages_received,
        records_stored,
        messages_skipped: messages_received.saturating_sub(normalized),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Loaded {} messages for session {} ({} skipped, {}ms)",
        stats.records_stored,
        session.as_str(),
        stats.messages_skipped,
        stats.duration_ms
    );

    Ok(stats)
}
