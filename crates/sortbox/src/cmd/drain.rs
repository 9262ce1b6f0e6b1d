use sortbox_channel::EMPTY_REPLY;
use sortbox_device::{DeviceFile, Result as DeviceResult};
use tracing::debug;

use crate::cmd::DrainArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_cycles, OutputFormat};

pub fn run(args: DrainArgs, format: OutputFormat) -> CliResult<i32> {
    let mut file = DeviceFile::open(&args.path).map_err(|err| device_error("open failed", err))?;
    let strings = drain_cycles(args.max, || file.read_cycle(args.capacity))
        .map_err(|err| device_error("read failed", err))?;
    debug!(count = strings.len(), "drain finished");
    print_cycles(&args.path, &strings, format);
    Ok(SUCCESS)
}

/// Run read cycles until the empty reply comes back or `max` strings were taken.
///
/// The empty reply itself is not returned.
fn drain_cycles<F>(max: Option<usize>, mut next: F) -> DeviceResult<Vec<Vec<u8>>>
where
    F: FnMut() -> DeviceResult<Vec<u8>>,
{
    let mut strings = Vec::new();
    while max.is_none_or(|max| strings.len() < max) {
        let content = next()?;
        if content == EMPTY_REPLY {
            break;
        }
        strings.push(content);
    }
    Ok(strings)
}
