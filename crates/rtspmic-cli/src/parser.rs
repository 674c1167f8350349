//! Top-level argument parser.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Feed an RTSP camera's audio into an ALSA loopback device as a virtual microphone.
#[derive(Parser, Debug)]
#[command(name = "rtsp-loopback-mic")]
#[command(about = "Supervise ffmpeg relaying RTSP audio into an ALSA loopback device")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// JSON file with the stream configuration attributes
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// RTSP URL of the camera stream (overrides the config file)
    #[arg(long = "rtsp-url", env = "RTSP_URL", global = true)]
    pub rtsp_url: Option<String>,

    /// Path to the ffmpeg executable (overrides the config file)
    #[arg(long = "ffmpeg-path", env = "FFMPEG_PATH", global = true)]
    pub ffmpeg_path: Option<String>,

    /// RTSP transport passed to ffmpeg, e.g. `tcp` (overrides the config file)
    #[arg(long = "rtsp-transport", global = true)]
    pub rtsp_transport: Option<String>,

    /// Automatic restarts allowed before giving up (overrides the config file)
    #[arg(long = "max-restarts", global = true)]
    pub max_restarts: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["rtsp-loopback-mic", "run"]);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                status_interval: 5.0,
                no_autostart: false
            })
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "rtsp-loopback-mic",
            "check-config",
            "--rtsp-url",
            "rtsp://cam/stream",
            "--max-restarts",
            "5",
            "-v",
        ]);
        assert_eq!(cli.command, Some(Commands::CheckConfig));
        assert_eq!(cli.rtsp_url.as_deref(), Some("rtsp://cam/stream"));
        assert_eq!(cli.max_restarts, Some(5));
        assert!(cli.verbose);
    }

    #[test]
    fn test_run_options() {
        let cli = Cli::parse_from([
            "rtsp-loopback-mic",
            "run",
            "--status-interval",
            "0",
            "--no-autostart",
        ]);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                status_interval: 0.0,
                no_autostart: true
            })
        );
    }
}
