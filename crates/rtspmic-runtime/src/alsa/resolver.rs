//! Loopback device resolution via `modprobe snd-aloop` and `arecord -l`.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

use rtspmic_core::{DeviceError, DeviceResolver, LoopbackDevice};

use super::commands::{DEFAULT_TOOL_TIMEOUT, run_tool};

/// Matches `card 4: Loopback [Loopback], device 0: Loopback PCM [Loopback PCM]`.
const CARD_LINE: &str = r"(?m)^card (\d+): ([^,]*), device (\d+): (.*)$";

const LOOPBACK_MODULE: &str = "snd-aloop";

/// A capture device as listed by `arecord -l`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub card: u32,
    pub card_name: String,
    pub device: u32,
    pub device_name: String,
}

impl CaptureDevice {
    fn is_loopback(&self) -> bool {
        self.card_name.to_lowercase().contains("loopback")
            || self.device_name.to_lowercase().contains("loopback")
    }

    /// Display name: the bracketed long name if present, else the short id.
    fn display_name(&self) -> String {
        match (self.card_name.find('['), self.card_name.rfind(']')) {
            (Some(open), Some(close)) if close > open => {
                self.card_name[open + 1..close].trim().to_string()
            }
            _ => self.card_name.trim().to_string(),
        }
    }
}

/// Parse `arecord -l` output into capture devices, in listing order.
pub fn parse_capture_devices(listing: &str) -> Result<Vec<CaptureDevice>, regex::Error> {
    let re = Regex::new(CARD_LINE)?;

    Ok(re
        .captures_iter(listing)
        .filter_map(|caps| {
            Some(CaptureDevice {
                card: caps[1].parse().ok()?,
                card_name: caps[2].trim().to_string(),
                device: caps[3].parse().ok()?,
                device_name: caps[4].trim().to_string(),
            })
        })
        .collect())
}

/// First loopback capture device in the listing.
pub fn select_loopback(devices: &[CaptureDevice]) -> Option<LoopbackDevice> {
    devices
        .iter()
        .find(|d| d.is_loopback())
        .map(|d| LoopbackDevice::new(d.card, d.device, d.display_name()))
}

/// [`DeviceResolver`] backed by the ALSA command-line tools.
#[derive(Debug, Clone)]
pub struct AlsaLoopbackResolver {
    modprobe: String,
    arecord: String,
    tool_timeout: Duration,
}

impl Default for AlsaLoopbackResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AlsaLoopbackResolver {
    pub fn new() -> Self {
        Self {
            modprobe: "modprobe".to_string(),
            arecord: "arecord".to_string(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Use different executables (tests point these at scripts).
    #[must_use]
    pub fn with_programs(
        mut self,
        modprobe: impl Into<String>,
        arecord: impl Into<String>,
    ) -> Self {
        self.modprobe = modprobe.into();
        self.arecord = arecord.into();
        self
    }

    #[must_use]
    pub const fn with_tool_timeout(mut self, limit: Duration) -> Self {
        self.tool_timeout = limit;
        self
    }

    /// Load the loopback module. Returns the failure text instead of erroring.
    async fn load_module(&self) -> Option<String> {
        match run_tool(&self.modprobe, &[LOOPBACK_MODULE], self.tool_timeout).await {
            Ok(_) => {
                debug!(module = LOOPBACK_MODULE, "kernel module loaded");
                None
            }
            Err(e) => {
                warn!(module = LOOPBACK_MODULE, error = %e, "failed to load kernel module");
                Some(e.to_string())
            }
        }
    }
}

#[async_trait]
impl DeviceResolver for AlsaLoopbackResolver {
    async fn resolve_loopback_device(&self) -> Result<LoopbackDevice, DeviceError> {
        let module_error = self.load_module().await;

        let listing = run_tool(&self.arecord, &["-l"], self.tool_timeout)
            .await
            .map_err(|e| DeviceError::Enumeration(e.to_string()))?;
        let devices =
            parse_capture_devices(&listing).map_err(|e| DeviceError::Enumeration(e.to_string()))?;
        debug!(count = devices.len(), "enumerated capture devices");

        let device = select_loopback(&devices).ok_or(DeviceError::NotFound { module_error })?;
        info!(device = %device, "resolved loopback device");
        Ok(device)
    }
}
