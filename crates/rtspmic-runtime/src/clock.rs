//! Monotonic time source shared by the runtime.

use std::time::Instant;

/// Current instant as seen by the tokio clock.
///
/// Going through tokio keeps restart cooldowns and staleness consistent with
/// `tokio::time` sleeps, including under a paused test clock.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
