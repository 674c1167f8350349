//! Subcommand definitions.

use clap::Subcommand;

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the stream supervisor in the foreground
    ///
    /// Prints a status line (JSON) every `--status-interval` seconds and reads
    /// newline-delimited JSON commands such as `{"command": "restart_stream"}`
    /// from stdin, answering each one on stdout. Ctrl-C stops the stream and
    /// exits.
    Run {
        /// Seconds between status lines (0 disables them)
        #[arg(long, default_value_t = 5.0)]
        status_interval: f64,

        /// Do not start streaming until a `start_stream` command arrives
        #[arg(long)]
        no_autostart: bool,
    },

    /// Resolve and print the ALSA loopback capture device
    Devices,

    /// Validate the configuration and print its normalized form
    CheckConfig,
}
