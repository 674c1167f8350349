//! Error-signature table for classifying streaming subprocess output.
//!
//! Classification is a case-insensitive substring match against
//! [`ERROR_SIGNATURES`], evaluated in table order. The table is data so new
//! signatures can be added (and tested) without touching the monitor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a detected stream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The RTSP server refused the TCP connection.
    ConnectionRefused,
    /// A network operation timed out.
    Timeout,
    /// No route to the RTSP host.
    NoRouteToHost,
    /// The peer reset the connection.
    ConnectionReset,
    /// Writing to the socket or the ALSA device failed.
    BrokenPipe,
    /// The input ended ("End of file" from the demuxer).
    EndOfFile,
    /// Network or host unreachable.
    NetworkUnreachable,
    /// The ALSA device is held open by another process.
    DeviceBusy,
    /// The output stream closed while the process was expected to be running.
    UnexpectedExit,
    /// No output for longer than the staleness threshold.
    Stale,
}

impl FailureKind {
    /// Whether recovery should reclaim the ALSA device before relaunching.
    pub const fn is_device_busy(self) -> bool {
        matches!(self, Self::DeviceBusy)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConnectionRefused => "connection refused",
            Self::Timeout => "timeout",
            Self::NoRouteToHost => "no route to host",
            Self::ConnectionReset => "connection reset",
            Self::BrokenPipe => "broken pipe",
            Self::EndOfFile => "end of file",
            Self::NetworkUnreachable => "network unreachable",
            Self::DeviceBusy => "device busy",
            Self::UnexpectedExit => "unexpected end of output",
            Self::Stale => "no output activity",
        };
        f.write_str(text)
    }
}

/// One row of the signature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSignature {
    /// Lowercase substring to look for.
    pub pattern: &'static str,
    /// Failure it maps to.
    pub kind: FailureKind,
}

/// Signatures that indicate the stream needs supervisor attention.
///
/// Device-busy patterns come first so "Device or resource busy" is not
/// shadowed by a more generic row.
pub const ERROR_SIGNATURES: &[ErrorSignature] = &[
    ErrorSignature {
        pattern: "device or resource busy",
        kind: FailureKind::DeviceBusy,
    },
    ErrorSignature {
        pattern: "device busy",
        kind: FailureKind::DeviceBusy,
    },
    ErrorSignature {
        pattern: "connection refused",
        kind: FailureKind::ConnectionRefused,
    },
    ErrorSignature {
        pattern: "connection reset",
        kind: FailureKind::ConnectionReset,
    },
    ErrorSignature {
        pattern: "no route to host",
        kind: FailureKind::NoRouteToHost,
    },
    ErrorSignature {
        pattern: "network is unreachable",
        kind: FailureKind::NetworkUnreachable,
    },
    ErrorSignature {
        pattern: "host is unreachable",
        kind: FailureKind::NetworkUnreachable,
    },
    ErrorSignature {
        pattern: "timeout",
        kind: FailureKind::Timeout,
    },
    ErrorSignature {
        pattern: "timed out",
        kind: FailureKind::Timeout,
    },
    ErrorSignature {
        pattern: "broken pipe",
        kind: FailureKind::BrokenPipe,
    },
    ErrorSignature {
        pattern: "end of file",
        kind: FailureKind::EndOfFile,
    },
];

/// Classify one output line against [`ERROR_SIGNATURES`].
pub fn classify_line(line: &str) -> Option<FailureKind> {
    classify_with(ERROR_SIGNATURES, line)
}

/// Classify against an arbitrary table (first match wins).
pub fn classify_with(table: &[ErrorSignature], line: &str) -> Option<FailureKind> {
    let lowered = line.to_lowercase();
    table
        .iter()
        .find(|sig| lowered.contains(sig.pattern))
        .map(|sig| sig.kind)
}
