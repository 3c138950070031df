//! Talk to a Sphero-style robot over Bluetooth RFCOMM.
//!
//! # Crate Structure
//!
//! - [`transport`]: Endpoints, blocking connect and async streams (RFCOMM, Unix sockets)
//! - [`frame`]: Command/response packet codec, response codes and command catalog
//! - [`conn`]: Connection with background reactor, sequence numbers and command dispatch
//!
//! ```no_run
//! use spherolink::conn::{ConnectionConfig, Dispatcher};
//! use spherolink::frame::{command::core_cmd, DID_CORE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = "68:86:E7:01:02:03".parse()?;
//! let dispatcher = Dispatcher::connect(endpoint, ConnectionConfig::default())?;
//! dispatcher.send_command(DID_CORE, core_cmd::PING)?;
//! let response = dispatcher.read_response()?;
//! println!("{}", response.response_code());
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use spherolink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use spherolink_frame::*;
}

/// Re-export connection types.
pub mod conn {
    pub use spherolink_conn::*;
}
