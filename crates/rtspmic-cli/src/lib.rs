//! Command-line adapter for rtsp-loopback-mic.
//!
//! Parses arguments, assembles the stream configuration and dispatches to
//! the subcommand handlers. The binary entry point lives in `main.rs`.
#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

// Re-export primary types for convenient access
pub use bootstrap::{ConfigOverrides, init_logging, load_config};
pub use commands::Commands;
pub use error::{CliError, CliResult};
pub use parser::Cli;
