//! Background tasks observing one streaming subprocess.
//!
//! - [`OutputMonitor`]: reads output lines, records activity, raises error signals
//! - [`StalenessWatchdog`]: raises a signal when output stops for too long
//!
//! Both are policy-free. They tag every signal with the launch generation
//! and leave the restart decision to the supervisor.

mod output;
mod watchdog;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rtspmic_core::ActivityState;

pub use output::OutputMonitor;
pub use watchdog::StalenessWatchdog;

/// Activity record shared between the monitor, the watchdog and status reads.
pub type SharedActivity = Arc<RwLock<ActivityState>>;

/// New empty shared activity record.
pub fn shared_activity() -> SharedActivity {
    Arc::new(RwLock::new(ActivityState::new()))
}

// A panic while holding the lock cannot leave ActivityState half-written in
// a way that matters, so poisoning is ignored.
pub(crate) fn read_activity(activity: &SharedActivity) -> RwLockReadGuard<'_, ActivityState> {
    activity.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_activity(activity: &SharedActivity) -> RwLockWriteGuard<'_, ActivityState> {
    activity.write().unwrap_or_else(PoisonError::into_inner)
}
