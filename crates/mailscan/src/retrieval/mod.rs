//! Message retrieval
//!
//! Loads a mailbox through the credential gateway and retrieval service
//! and replaces the store's contents.

mod inbox;

pub use inbox::{RetrievalStats, load_inbox};
