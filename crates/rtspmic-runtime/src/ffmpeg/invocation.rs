//! ffmpeg command-line construction.

use std::process::Stdio;
use tokio::process::Command;

use rtspmic_core::{LoopbackDevice, StreamConfig};

/// Builder for the ffmpeg invocation that pipes an RTSP source into ALSA.
///
/// Input options (transport, reconnect) go before `-i` so they apply to the
/// RTSP demuxer rather than the output.
///
/// # Example
///
/// ```rust,ignore
/// let cmd = FfmpegInvocation::new("ffmpeg", "rtsp://cam/stream", "hw:4,0,0")
///     .rtsp_transport(Some("tcp"))
///     .reconnect(Some(10))
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegInvocation {
    program: String,
    rtsp_url: String,
    hw_path: String,
    rtsp_transport: Option<String>,
    reconnect_delay_max: Option<u32>,
}

impl FfmpegInvocation {
    pub fn new(
        program: impl Into<String>,
        rtsp_url: impl Into<String>,
        hw_path: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            rtsp_url: rtsp_url.into(),
            hw_path: hw_path.into(),
            rtsp_transport: None,
            reconnect_delay_max: None,
        }
    }

    /// Invocation for `rtsp_url` → `device` with the tuning from `config`.
    pub fn for_stream(config: &StreamConfig, rtsp_url: &str, device: &LoopbackDevice) -> Self {
        Self::new(&config.ffmpeg_path, rtsp_url, device.hw_path())
            .rtsp_transport(config.rtsp_transport.as_deref())
            .reconnect(config.reconnect.then_some(config.reconnect_delay_max_secs))
    }

    /// Set `-rtsp_transport`.
    #[must_use]
    pub fn rtsp_transport(mut self, transport: Option<&str>) -> Self {
        self.rtsp_transport = transport.map(str::to_string);
        self
    }

    /// Enable ffmpeg's own reconnect with the given maximum delay; `None` disables it.
    #[must_use]
    pub const fn reconnect(mut self, delay_max_secs: Option<u32>) -> Self {
        self.reconnect_delay_max = delay_max_secs;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name, in order.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into()];

        if let Some(ref transport) = self.rtsp_transport {
            args.push("-rtsp_transport".into());
            args.push(transport.clone());
        }

        if let Some(delay_max) = self.reconnect_delay_max {
            args.extend([
                "-reconnect".into(),
                "1".into(),
                "-reconnect_streamed".into(),
                "1".into(),
                "-reconnect_delay_max".into(),
                delay_max.to_string(),
            ]);
        }

        args.extend([
            "-i".into(),
            self.rtsp_url.clone(),
            "-vn".into(),
            "-f".into(),
            "alsa".into(),
            self.hw_path.clone(),
        ]);
        args
    }

    /// Build the command: stdin closed, stdout discarded, stderr piped for the monitor.
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}
