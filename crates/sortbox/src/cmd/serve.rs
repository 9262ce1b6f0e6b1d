use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sortbox_device::{DeviceConfig, DeviceServer};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{device_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = DeviceConfig {
        mode: args.mode,
        ..DeviceConfig::default()
    };
    let server =
        DeviceServer::bind(&args.path, config).map_err(|err| device_error("bind failed", err))?;
    info!(path = %args.path.display(), mode = %format!("{:o}", args.mode), "device ready");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    server
        .serve(&running)
        .map_err(|err| device_error("serve failed", err))?;

    let stats = server.channel().mailbox().stats();
    info!(cells = stats.cells, bytes = stats.bytes, "serve loop stopped");
    print_stats(&args.path, stats, format);
    let released = server.shutdown();
    info!(released, "device removed");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
