//! Loopback device identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ALSA capture device backed by the `snd-aloop` kernel module.
///
/// Resolved once by the device resolver and immutable afterwards. The short
/// identifier is the card index; the hardware path is what the streaming
/// subprocess writes into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopbackDevice {
    /// ALSA card index (`card N:` in `arecord -l`).
    pub card: u32,
    /// Device index on that card.
    pub device: u32,
    /// Subdevice index.
    pub subdevice: u32,
    /// Descriptive name reported by ALSA.
    pub name: String,
}

impl LoopbackDevice {
    /// Create a device on the given card and device index, subdevice 0.
    pub fn new(card: u32, device: u32, name: impl Into<String>) -> Self {
        Self {
            card,
            device,
            subdevice: 0,
            name: name.into(),
        }
    }

    /// Short identifier used in status readings (the card index).
    pub fn short_id(&self) -> String {
        self.card.to_string()
    }

    /// Full hardware path, e.g. `hw:4,0,0`.
    pub fn hw_path(&self) -> String {
        format!("hw:{},{},{}", self.card, self.device, self.subdevice)
    }
}

impl fmt::Display for LoopbackDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hw_path(), self.name)
    }
}
