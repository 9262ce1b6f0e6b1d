use std::fs;

use sortbox_device::DeviceFile;

use crate::cmd::WriteArgs;
use crate::exit::{device_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_write, OutputFormat};

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let mut file = DeviceFile::open(&args.path).map_err(|err| device_error("open failed", err))?;
    let written = file
        .write_string(&payload)
        .map_err(|err| device_error("write failed", err))?;
    print_write(&args.path, written, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &WriteArgs) -> CliResult<Vec<u8>> {
    let mut payload = if let Some(data) = &args.data {
        data.as_bytes().to_vec()
    } else if let Some(path) = &args.file {
        fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?
    } else {
        return Err(CliError::new(USAGE, "one of --data or --file is required"));
    };
    if args.newline {
        payload.push(b'\n');
    }
    Ok(payload)
}
