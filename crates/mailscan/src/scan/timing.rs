//! Scan settling delay
//!
//! A scan stays in `Scanning` for at least a minimum visible duration so an
//! interactive caller never sees the state flicker on fast responses.

use std::time::{Duration, Instant};

/// How much longer a scan must remain visible
///
/// # Arguments
/// * `elapsed` - Time already spent scanning
/// * `floor` - Minimum visible scanning duration (zero disables settling)
pub fn settle_remaining(elapsed: Duration, floor: Duration) -> Duration {
    floor.saturating_sub(elapsed)
}

/// Block until at least `floor` has passed since `started`
pub fn settle(started: Instant, floor: Duration) {
    let remaining = settle_remaining(started.elapsed(), floor);
    if !remaining.is_zero() {
        std::thread::sleep(remaining);
    }
}
