use std::time::Duration;

use spherolink_frame::FrameConfig;

/// Retries after the first failed connect attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Pause between connect attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Size of the receive scratch buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Configuration for a [`Connection`](crate::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Connect attempts after the first one before giving up.
    pub max_retries: u32,
    /// Sleep between connect attempts.
    pub retry_delay: Duration,
    /// Bytes requested per socket read. One read is treated as one frame.
    pub read_buffer_size: usize,
    /// Upper bound for [`Connection::read`](crate::Connection::read).
    /// `None` blocks until a frame arrives or the connection closes.
    pub read_timeout: Option<Duration>,
    /// Decoder settings.
    pub frame: FrameConfig,
}

impl ConnectionConfig {
    /// Total number of connect attempts.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            read_timeout: None,
            frame: FrameConfig::default(),
        }
    }
}
