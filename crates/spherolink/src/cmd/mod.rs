use std::time::Duration;

use clap::{Args, Subcommand};
use spherolink_conn::ConnectionConfig;
use spherolink_transport::Endpoint;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod catalog;
pub mod listen;
pub mod ping;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, send PING and print the reply.
    Ping(PingArgs),
    /// Send a single command.
    Send(SendArgs),
    /// Print every frame the device sends.
    Listen(ListenArgs),
    /// List known commands.
    Catalog(CatalogArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: ConnectionConfig) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, format, config),
        Command::Send(args) => send::run(args, format, config),
        Command::Listen(args) => listen::run(args, format, config),
        Command::Catalog(args) => catalog::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Device address (AA:BB:CC:DD:EE:FF[@channel] or unix:/path).
    pub endpoint: Endpoint,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device address (AA:BB:CC:DD:EE:FF[@channel] or unix:/path).
    pub endpoint: Endpoint,
    /// Command name from the catalog.
    #[arg(long, conflicts_with_all = ["device", "id"], required_unless_present = "device")]
    pub command: Option<String>,
    /// Device id (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_byte, requires = "id")]
    pub device: Option<u8>,
    /// Command id (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_byte, requires = "device")]
    pub id: Option<u8>,
    /// Payload as hex bytes (e.g. ff000000).
    #[arg(long)]
    pub data: Option<String>,
    /// Do not ask the device for a reply.
    #[arg(long)]
    pub no_answer: bool,
    /// Reset the device's inactivity timeout.
    #[arg(long)]
    pub reset_timeout: bool,
    /// Wait for one response and print it.
    #[arg(long, conflicts_with = "no_answer")]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device address (AA:BB:CC:DD:EE:FF[@channel] or unix:/path).
    pub endpoint: Endpoint,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct CatalogArgs {
    /// Only list commands for this device (core or sphero).
    #[arg(long)]
    pub device: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("expected a byte value (0-255 or 0x00-0xFF), got {input:?}"))
}
