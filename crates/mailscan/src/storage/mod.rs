//! Message storage
//!
//! The store is the only owner of record mutation. Scope selection and
//! derived views read from it and never write.

mod memory;

pub use memory::{MergeStats, MessageStore};
