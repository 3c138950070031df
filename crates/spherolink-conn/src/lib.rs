//! Connection management for a single Sphero-style device.
//!
//! A [`Connection`] owns one stream and a background reactor thread:
//! - `send` queues encoded frames; the reactor writes them in order
//! - the reactor reads chunks off the socket and queues them as frames
//! - `read` blocks the caller until a frame is queued
//!
//! A [`Dispatcher`] sits on top and stamps sequence numbers onto commands.
//!
//! Unix only: the reactor drives the stream types from `spherolink-transport`.

#![cfg(unix)]

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
mod pipeline;
pub mod sequence;
pub mod state;

pub use config::{
    ConnectionConfig, DEFAULT_MAX_RETRIES, DEFAULT_READ_BUFFER_SIZE, DEFAULT_RETRY_DELAY,
};
pub use connection::Connection;
pub use dispatcher::{Command, Dispatcher};
pub use error::{ConnError, Result};
pub use sequence::SequenceCounter;
pub use state::ConnectionState;
pub use tokio_util::sync::CancellationToken;
