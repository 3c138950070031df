use std::time::Duration;

use spherolink_conn::{Command, ConnectionConfig, Dispatcher};
use spherolink_frame::{device_name, CommandFlags};
use tracing::{debug, info};

use crate::cmd::SendArgs;
use crate::exit::{conn_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_response, OutputFormat};

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run(args: SendArgs, format: OutputFormat, config: ConnectionConfig) -> CliResult<i32> {
    let command = resolve_command(&args)?;
    let dispatcher = Dispatcher::connect(args.endpoint.clone(), config)
        .map_err(|err| conn_error("connect failed", err))?;

    let seq = dispatcher
        .send_command_with(&command)
        .map_err(|err| conn_error("send failed", err))?;
    info!(
        device = device_name(command.device_id),
        command_id = command.command_id,
        seq,
        "command queued"
    );

    let code = if args.wait {
        let response = dispatcher
            .read_response()
            .map_err(|err| conn_error("no response", err))?;
        print_response(&response, &args.endpoint, format);
        if response.response_code().is_success() {
            SUCCESS
        } else {
            FAILURE
        }
    } else {
        let connection = dispatcher.connection();
        let timeout = connection
            .config()
            .read_timeout
            .unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        connection
            .flush(timeout)
            .map_err(|err| conn_error("command not written", err))?;
        debug!("outbound queue drained");
        SUCCESS
    };

    dispatcher.close();
    Ok(code)
}

fn resolve_command(args: &SendArgs) -> CliResult<Command> {
    let command = match (&args.command, args.device, args.id) {
        (Some(name), _, _) => Command::named(name).ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("unknown command {name:?} (see `spherolink catalog`)"),
            )
        })?,
        (None, Some(device_id), Some(command_id)) => Command::new(device_id, command_id),
        _ => {
            return Err(CliError::new(
                USAGE,
                "either --command or both --device and --id are required",
            ))
        }
    };

    let payload = match &args.data {
        Some(hex) => parse_hex(hex)?,
        None => Vec::new(),
    };

    Ok(command.with_payload(payload).with_flags(CommandFlags {
        answer: !args.no_answer,
        reset_timeout: args.reset_timeout,
    }))
}

/// Decode hex bytes, ignoring whitespace, `:` separators and a `0x` prefix.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if !digits.is_ascii() {
        return Err(CliError::new(USAGE, format!("--data is not valid hex: {input:?}")));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("--data must contain whole bytes, got {} hex digits", digits.len()),
        ));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| CliError::new(USAGE, format!("--data is not valid hex: {input:?}")))
        })
        .collect()
}
