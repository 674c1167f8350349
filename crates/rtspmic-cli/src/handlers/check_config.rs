//! `check-config`: print the validated configuration.

use rtspmic_core::StreamConfig;

use crate::error::CliResult;

/// Print `config` as pretty JSON, every default filled in.
pub fn execute(config: &StreamConfig) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
