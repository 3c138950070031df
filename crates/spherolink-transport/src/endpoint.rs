use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Length of a textual Bluetooth address: six two-digit hex values plus five colons.
pub const BDADDR_STR_LEN: usize = 17;

/// RFCOMM channel used when an endpoint string does not name one.
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

/// A 48-bit Bluetooth device address, stored in the order it is written
/// (`AA:BB:CC:DD:EE:FF` is `[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    /// Address bytes in the little-endian order the kernel expects in `bdaddr_t`.
    pub fn to_le_bytes(self) -> [u8; 6] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BdAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidAddress(s.to_string());
        if s.len() != BDADDR_STR_LEN {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

/// Where a connection goes. Bound once to a connection before `connect`.
///
/// Text forms accepted by [`FromStr`]:
/// - `AA:BB:CC:DD:EE:FF` or `AA:BB:CC:DD:EE:FF@3` for RFCOMM (channel 1 by default)
/// - `unix:/path/to/socket` for a local stream socket (bench devices, tests)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Bluetooth RFCOMM device address and channel.
    Rfcomm { address: BdAddr, channel: u8 },
    /// Unix domain stream socket path.
    Unix(PathBuf),
}

impl Endpoint {
    /// RFCOMM endpoint on the default channel.
    pub fn rfcomm(address: BdAddr) -> Self {
        Self::Rfcomm {
            address,
            channel: DEFAULT_RFCOMM_CHANNEL,
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Rfcomm { .. } => "bluetooth-rfcomm",
            Self::Unix(_) => "unix-domain-socket",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rfcomm { address, channel } => write!(f, "{address}@{channel}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(TransportError::InvalidAddress(s.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        let (addr, channel) = match s.split_once('@') {
            Some((addr, channel)) => {
                let channel = channel
                    .parse::<u8>()
                    .map_err(|_| TransportError::InvalidAddress(s.to_string()))?;
                (addr, channel)
            }
            None => (s, DEFAULT_RFCOMM_CHANNEL),
        };

        Ok(Self::Rfcomm {
            address: addr.parse()?,
            channel,
        })
    }
}
