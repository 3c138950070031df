//! Packet framing for the Sphero-style serial protocol.
//!
//! Commands and responses share a two-byte start marker and a one-byte
//! checksum, but differ in header layout:
//! - Command: `FF flags DID CID SEQ DLEN payload CHK`, where `DLEN` counts the
//!   checksum byte
//! - Response: `FF SOP2 MRSP SEQ DLEN payload CHK`
//!
//! Pure codec, no I/O. The connection layer moves these frames over a stream.

pub mod codec;
pub mod command;
pub mod error;
pub mod response;
pub mod traits;

pub use codec::{
    align_to_marker, checksum, command_checksum, decode_response, encode_command, CommandFlags,
    CommandFrame, FrameConfig, PayloadInt, ResponseFrame, COMMAND_HEADER_SIZE, MAX_PAYLOAD,
    RESPONSE_HEADER_SIZE, SOP1, SOP2_ASYNC, SOP2_SYNC,
};
pub use command::{
    command_name, device_name, lookup_command, CatalogEntry, CATALOG, DID_CORE, DID_SPHERO,
};
pub use error::{FrameError, Result};
pub use response::{response_code_description, ResponseCode};
pub use traits::{Decode, Encode, RawFrame};
