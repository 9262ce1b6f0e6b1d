use sortbox_device::DeviceFile;

use crate::cmd::ReadArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_cycles, OutputFormat};

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let mut file = DeviceFile::open(&args.path).map_err(|err| device_error("open failed", err))?;
    let content = file
        .read_cycle(args.capacity)
        .map_err(|err| device_error("read failed", err))?;
    print_cycles(&args.path, &[content], format);
    Ok(SUCCESS)
}
