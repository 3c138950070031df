use spherolink_conn::{ConnectionConfig, Dispatcher};
use spherolink_frame::command::core_cmd;
use spherolink_frame::DID_CORE;
use tracing::info;

use crate::cmd::PingArgs;
use crate::exit::{conn_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub fn run(args: PingArgs, format: OutputFormat, config: ConnectionConfig) -> CliResult<i32> {
    let dispatcher = Dispatcher::connect(args.endpoint.clone(), config)
        .map_err(|err| conn_error("connect failed", err))?;

    let seq = dispatcher
        .send_command(DID_CORE, core_cmd::PING)
        .map_err(|err| conn_error("send failed", err))?;
    let response = dispatcher
        .read_response()
        .map_err(|err| conn_error("no response", err))?;
    info!(seq, code = response.code, "ping answered");

    print_response(&response, &args.endpoint, format);
    dispatcher.close();

    if response.response_code().is_success() {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}
