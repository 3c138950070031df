use spherolink_conn::{CancellationToken, ConnError, ConnectionConfig, Dispatcher};
use spherolink_frame::ResponseFrame;
use tracing::{debug, info};

use crate::cmd::ListenArgs;
use crate::exit::{conn_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat, config: ConnectionConfig) -> CliResult<i32> {
    let dispatcher = Dispatcher::connect(args.endpoint.clone(), config)
        .map_err(|err| conn_error("connect failed", err))?;
    let connection = dispatcher.connection();

    let stop = CancellationToken::new();
    install_ctrlc_handler(stop.clone())?;

    let mut printed = 0usize;
    loop {
        let frame = match connection.read_cancellable::<ResponseFrame>(&stop) {
            Ok(frame) => frame,
            Err(ConnError::Timeout(_)) => continue,
            Err(ConnError::Cancelled) => break,
            Err(ConnError::NotConnected(reason)) => {
                info!(%reason, "device disconnected");
                break;
            }
            Err(err @ ConnError::Frame(_)) => {
                debug!(error = %err, "skipping undecodable frame");
                continue;
            }
            Err(err) => return Err(conn_error("receive failed", err)),
        };

        print_response(&frame, &args.endpoint, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    dispatcher.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(stop: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
