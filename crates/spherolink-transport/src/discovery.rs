use std::time::Duration;

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::Result;

/// A device reported by a platform inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Friendly name advertised by the device.
    pub name: String,
    /// Address usable by `connect`.
    pub endpoint: Endpoint,
}

/// Source of nearby devices.
///
/// Platform scanning lives outside this crate; implementations only need to
/// return whatever the last inquiry found.
pub trait Discovery {
    /// Run one inquiry and return every device seen.
    fn inquire(&self) -> Result<Vec<DiscoveredDevice>>;
}

impl Discovery for Vec<DiscoveredDevice> {
    fn inquire(&self) -> Result<Vec<DiscoveredDevice>> {
        Ok(self.clone())
    }
}

/// Repeat inquiry until a device whose name contains `pattern` shows up.
///
/// Sleeps `delay` between unsuccessful inquiries and gives up after
/// `attempts` rounds, returning `Ok(None)`.
pub fn find_device<D: Discovery + ?Sized>(
    discovery: &D,
    pattern: &str,
    attempts: usize,
    delay: Duration,
) -> Result<Option<DiscoveredDevice>> {
    for attempt in 1..=attempts {
        let devices = discovery.inquire()?;
        if let Some(device) = devices.into_iter().find(|d| d.name.contains(pattern)) {
            info!(name = %device.name, endpoint = %device.endpoint, "found device");
            return Ok(Some(device));
        }

        debug!(pattern, attempt, attempts, "device not found");
        if attempt < attempts {
            std::thread::sleep(delay);
        }
    }
    Ok(None)
}
