//! Subcommand handlers.

pub mod check_config;
pub mod devices;
pub mod run;
