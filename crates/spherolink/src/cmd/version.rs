use spherolink_conn::{DEFAULT_MAX_RETRIES, DEFAULT_READ_BUFFER_SIZE, DEFAULT_RETRY_DELAY};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("spherolink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: spherolink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SPHEROLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "transports: unix{}",
        if cfg!(target_os = "linux") { ", rfcomm" } else { "" }
    );
    println!(
        "defaults: max_retries={DEFAULT_MAX_RETRIES}, retry_delay={DEFAULT_RETRY_DELAY:?}, read_buffer={DEFAULT_READ_BUFFER_SIZE}"
    );

    Ok(SUCCESS)
}
