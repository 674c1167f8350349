//! Staleness watchdog.

use std::time::Duration;

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rtspmic_core::{FailureKind, StreamSignal};

use super::{SharedActivity, read_activity};
use crate::clock;

/// Polls the activity record and signals when output has stopped.
///
/// Yields once per stale episode: after firing it stays quiet until output
/// resumes and then stops again.
pub struct StalenessWatchdog {
    generation: u64,
    activity: SharedActivity,
    threshold: Duration,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl StalenessWatchdog {
    /// Create a watchdog.
    ///
    /// # Arguments
    ///
    /// * `generation` - Launch generation the signals are tagged with
    /// * `activity` - Activity record written by the output monitor
    /// * `threshold` - Silence longer than this counts as stale
    /// * `check_interval` - How often to poll
    /// * `cancel_token` - Stops the watchdog
    pub const fn new(
        generation: u64,
        activity: SharedActivity,
        threshold: Duration,
        check_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            generation,
            activity,
            threshold,
            interval: check_interval,
            cancel_token,
        }
    }

    /// Stream of stale signals. Completes when the token is cancelled.
    pub fn watch(self) -> impl Stream<Item = StreamSignal> {
        let Self {
            generation,
            activity,
            threshold,
            interval: check_interval,
            cancel_token,
        } = self;
        let threshold_secs = threshold.as_secs_f64();

        stream! {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut stale = false;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let idle = read_activity(&activity).seconds_since_activity(clock::now());
                        if idle > threshold_secs {
                            if !stale {
                                stale = true;
                                warn!(
                                    generation,
                                    idle_secs = idle,
                                    "no output from ffmpeg, stream is stale"
                                );
                                yield StreamSignal::new(
                                    generation,
                                    FailureKind::Stale,
                                    format!("no output for {idle:.1}s"),
                                );
                            }
                        } else if stale {
                            debug!(generation, "output resumed");
                            stale = false;
                        }
                    }
                    () = cancel_token.cancelled() => {
                        debug!(generation, "staleness watchdog cancelled");
                        break;
                    }
                }
            }
        }
    }

    /// Forward signals into `signals` on a background task.
    pub fn spawn(self, signals: UnboundedSender<StreamSignal>) -> JoinHandle<()> {
        let stale = self.watch();
        tokio::spawn(async move {
            tokio::pin!(stale);
            while let Some(signal) = stale.next().await {
                if signals.send(signal).is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{shared_activity, write_activity};
    use tokio::time::{advance, timeout};

    fn watchdog(activity: &SharedActivity, cancel: &CancellationToken) -> StalenessWatchdog {
        StalenessWatchdog::new(
            5,
            activity.clone(),
            Duration::from_secs(30),
            Duration::from_secs(1),
            cancel.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_stale_episode() {
        let activity = shared_activity();
        write_activity(&activity).touch(clock::now());
        let cancel = CancellationToken::new();
        let stream = watchdog(&activity, &cancel).watch();
        tokio::pin!(stream);

        // Fresh activity: nothing within the threshold
        assert!(timeout(Duration::from_secs(20), stream.next()).await.is_err());

        let signal = stream.next().await.unwrap();
        assert_eq!(signal.kind, FailureKind::Stale);
        assert_eq!(signal.generation, 5);

        // Still stale: no second signal
        assert!(timeout(Duration::from_secs(60), stream.next()).await.is_err());

        // Output resumes, then stops again: a new episode
        write_activity(&activity).record_line("size=  1kB", clock::now());
        advance(Duration::from_secs(2)).await;
        let again = timeout(Duration::from_secs(40), stream.next()).await.unwrap();
        assert_eq!(again.unwrap().kind, FailureKind::Stale);

        cancel.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_activity_recorded_never_fires() {
        let cancel = CancellationToken::new();
        let stream = watchdog(&shared_activity(), &cancel).watch();
        tokio::pin!(stream);
        assert!(timeout(Duration::from_secs(120), stream.next()).await.is_err());
    }
}
