use std::time::Duration;

/// Errors that can occur on a device connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// The connection is not open: never connected, closed, or every
    /// connect attempt failed.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] spherolink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] spherolink_frame::FrameError),

    /// A read or flush did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The read was cancelled by its token.
    #[error("read cancelled")]
    Cancelled,

    /// Failed to start the reactor.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConnError>;
