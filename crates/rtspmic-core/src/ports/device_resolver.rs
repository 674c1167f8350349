//! Loopback device resolution port.

use async_trait::async_trait;

use super::DeviceError;
use crate::domain::LoopbackDevice;

/// Finds (and if necessary creates) the loopback capture device.
///
/// Implementations must be idempotent: resolving twice on a host where the
/// kernel module is already loaded returns the same device.
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    /// Resolve the loopback device the streaming subprocess writes into.
    async fn resolve_loopback_device(&self) -> Result<LoopbackDevice, DeviceError>;
}
