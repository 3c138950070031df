//! Stream transports for talking to a single short-range wireless device.
//!
//! Provides a unified interface over:
//! - Bluetooth RFCOMM sockets (Linux)
//! - Unix domain stream sockets (bench devices, tests)
//!
//! This is the lowest layer of spherolink. [`connect`] performs a blocking
//! connect and returns a [`RawStream`]; the connection layer hands that to its
//! reactor thread, which wraps it in an async [`BtStream`].
//!
//! Streams need a Unix platform; addresses and discovery build anywhere.

pub mod discovery;
pub mod endpoint;
pub mod error;
#[cfg(target_os = "linux")]
pub mod rfcomm;
#[cfg(unix)]
pub mod stream;

pub use discovery::{find_device, DiscoveredDevice, Discovery};
pub use endpoint::{BdAddr, Endpoint, BDADDR_STR_LEN, DEFAULT_RFCOMM_CHANNEL};
pub use error::{Result, TransportError};
#[cfg(unix)]
pub use stream::{connect, BtStream, RawStream};

#[cfg(target_os = "linux")]
pub use rfcomm::RfcommSocket;
