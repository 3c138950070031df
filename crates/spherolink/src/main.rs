#[cfg(not(unix))]
compile_error!("the spherolink CLI needs a Unix platform");

mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use spherolink_conn::{ConnectionConfig, DEFAULT_MAX_RETRIES};
use spherolink_frame::FrameConfig;

use crate::cmd::{parse_duration, Command};
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "spherolink", version, about = "Sphero Bluetooth client CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Connect attempts after the first one.
    #[arg(
        long,
        env = "SPHEROLINK_MAX_RETRIES",
        default_value_t = DEFAULT_MAX_RETRIES,
        global = true
    )]
    max_retries: u32,

    /// Pause between connect attempts (e.g. 5s, 500ms).
    #[arg(long, env = "SPHEROLINK_RETRY_DELAY", default_value = "5s", global = true)]
    retry_delay: String,

    /// How long to wait for a response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    timeout: String,

    /// Reject responses whose checksum does not match.
    #[arg(long, global = true)]
    validate_checksum: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn connection_config(&self) -> CliResult<ConnectionConfig> {
        Ok(ConnectionConfig {
            max_retries: self.max_retries,
            retry_delay: parse_duration(&self.retry_delay)?,
            read_timeout: Some(parse_duration(&self.timeout)?),
            frame: FrameConfig {
                validate_checksum: self.validate_checksum,
            },
            ..ConnectionConfig::default()
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cli
        .connection_config()
        .and_then(|config| cmd::run(cli.command, format, config));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
