use std::time::Duration;

use bytes::Bytes;
use spherolink_frame::{lookup_command, CatalogEntry, CommandFlags, CommandFrame, ResponseFrame};
use spherolink_transport::Endpoint;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::sequence::SequenceCounter;

/// A command waiting for its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub device_id: u8,
    pub command_id: u8,
    pub payload: Bytes,
    pub flags: CommandFlags,
}

impl Command {
    /// A command with no payload, answer requested, no timeout reset.
    pub fn new(device_id: u8, command_id: u8) -> Self {
        Self {
            device_id,
            command_id,
            payload: Bytes::new(),
            flags: CommandFlags::default(),
        }
    }

    /// Look a command up in the catalog by name.
    pub fn named(name: &str) -> Option<Self> {
        lookup_command(name).map(Self::from)
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Fire-and-forget: the device sends no reply and its inactivity timer
    /// is reset.
    pub fn without_answer(self) -> Self {
        self.with_flags(CommandFlags::ASYNC)
    }

    /// The frame this command produces for sequence number `seq`.
    pub fn frame(&self, seq: u8) -> CommandFrame {
        CommandFrame::new(self.device_id, self.command_id, seq)
            .with_payload(self.payload.clone())
            .with_flags(self.flags)
    }
}

impl From<CatalogEntry> for Command {
    fn from(entry: CatalogEntry) -> Self {
        Self::new(entry.device_id, entry.command_id)
    }
}

/// Stamps sequence numbers onto commands and sends them over a [`Connection`].
#[derive(Debug)]
pub struct Dispatcher {
    connection: Connection,
    sequence: SequenceCounter,
}

impl Dispatcher {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            sequence: SequenceCounter::new(),
        }
    }

    /// A dispatcher over a connection with no endpoint. Every call fails with
    /// `NotConnected`.
    pub fn disconnected(config: ConnectionConfig) -> Self {
        Self::new(Connection::new(config))
    }

    /// Bind `endpoint`, connect with retry and wrap the connection.
    pub fn connect(endpoint: Endpoint, config: ConnectionConfig) -> Result<Self> {
        Ok(Self::new(Connection::open(endpoint, config)?))
    }

    /// Send `(device_id, command_id)` with no payload and default flags.
    ///
    /// Returns the sequence number the command carried. The counter advances
    /// only when the frame was queued.
    pub fn send_command(&self, device_id: u8, command_id: u8) -> Result<u8> {
        self.send_command_with(&Command::new(device_id, command_id))
    }

    /// Send a fully specified command.
    pub fn send_command_with(&self, command: &Command) -> Result<u8> {
        self.sequence.stamp(|seq| {
            self.connection.send(&command.frame(seq))?;
            debug!(
                device_id = command.device_id,
                command_id = command.command_id,
                seq,
                "command sent"
            );
            Ok(seq)
        })
    }

    /// Block until the next response arrives.
    ///
    /// Responses come back in arrival order; the sequence number of the
    /// returned frame is not checked against any sent command.
    pub fn read_response(&self) -> Result<ResponseFrame> {
        let response = self.connection.read::<ResponseFrame>()?;
        self.trace_response(&response);
        Ok(response)
    }

    /// Like [`read_response`](Self::read_response) with a deadline.
    pub fn read_response_timeout(&self, timeout: Duration) -> Result<ResponseFrame> {
        let response = self.connection.read_timeout::<ResponseFrame>(timeout)?;
        self.trace_response(&response);
        Ok(response)
    }

    fn trace_response(&self, response: &ResponseFrame) {
        debug!(
            code = response.code,
            seq = response.seq,
            data_length = response.data_length,
            "response: {}",
            response.response_code()
        );
    }

    /// Sequence number the next command will carry.
    pub fn next_sequence(&self) -> u8 {
        self.sequence.peek()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn close(&self) {
        self.connection.close();
    }
}
