//! Query API for presentation consumption
//!
//! Read-only projections over message records.

mod views;

pub use views::{ScanSummary, filtered, phishing, safe, selected};
