//! Output monitor: turns subprocess output into activity and error signals.

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rtspmic_core::{FailureKind, OutputStream, StreamSignal, classify_line};

use super::{SharedActivity, read_activity, write_activity};
use crate::clock;
use crate::process::output_lines;

/// Detail used when the stream ends without any output.
const EOF_DETAIL: &str = "unexpected end of file";

/// Consumes the output of one process until end-of-stream or cancellation.
pub struct OutputMonitor {
    generation: u64,
    activity: SharedActivity,
    signals: UnboundedSender<StreamSignal>,
    cancel_token: CancellationToken,
}

impl OutputMonitor {
    pub const fn new(
        generation: u64,
        activity: SharedActivity,
        signals: UnboundedSender<StreamSignal>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            generation,
            activity,
            signals,
            cancel_token,
        }
    }

    /// Run on a background task.
    pub fn spawn(self, output: OutputStream) -> JoinHandle<()> {
        tokio::spawn(self.run(output))
    }

    /// Read `output` to the end.
    ///
    /// Every non-empty line updates the activity record; lines matching the
    /// signature table raise a signal. End of stream raises
    /// [`FailureKind::UnexpectedExit`] unless the monitor was cancelled.
    pub async fn run(self, output: OutputStream) {
        let lines = output_lines(output);
        tokio::pin!(lines);

        debug!(generation = self.generation, "output monitor started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    debug!(generation = self.generation, "output monitor cancelled");
                    return;
                }
                next = lines.next() => match next {
                    Some(line) => self.observe(&line),
                    None => break,
                },
            }
        }

        if self.cancel_token.is_cancelled() {
            return;
        }

        let detail = {
            let activity = read_activity(&self.activity);
            if activity.last_line().is_empty() {
                EOF_DETAIL.to_string()
            } else {
                activity.last_line().to_string()
            }
        };
        debug!(generation = self.generation, "output stream ended");
        self.emit(FailureKind::UnexpectedExit, detail);
    }

    fn observe(&self, line: &str) {
        debug!(generation = self.generation, "ffmpeg: {line}");
        write_activity(&self.activity).record_line(line, clock::now());

        if let Some(kind) = classify_line(line) {
            warn!(generation = self.generation, %kind, line, "stream error detected");
            self.emit(kind, line);
        }
    }

    fn emit(&self, kind: FailureKind, detail: impl Into<String>) {
        // The receiver is gone only while the supervisor shuts down
        let _ = self
            .signals
            .send(StreamSignal::new(self.generation, kind, detail));
    }
}
