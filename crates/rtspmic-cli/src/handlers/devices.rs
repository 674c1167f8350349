//! `devices`: resolve the ALSA loopback capture device.

use rtspmic_core::DeviceResolver;
use rtspmic_runtime::AlsaLoopbackResolver;
use serde_json::json;

use crate::error::CliResult;

/// Load `snd-aloop` if needed, find the loopback card and print it.
pub async fn execute() -> CliResult<()> {
    let device = AlsaLoopbackResolver::new().resolve_loopback_device().await?;

    let report = json!({
        "name": device.name,
        "loopback_device": device.short_id(),
        "loopback_device_full": device.hw_path(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
