use clap::{Args, Subcommand};
use std::path::PathBuf;

use sortbox_channel::DEFAULT_READ_CAPACITY;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod drain;
pub mod read;
pub mod serve;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the device node and serve it until interrupted.
    Serve(ServeArgs),
    /// Store one string.
    Write(WriteArgs),
    /// Take the smallest stored string (one read cycle).
    Read(ReadArgs),
    /// Take every stored string in sorted order.
    Drain(DrainArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Drain(args) => drain::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Device node path to create.
    pub path: PathBuf,
    /// Node permission bits, in octal (e.g. 0666).
    #[arg(long, value_parser = parse_mode, default_value = "0600")]
    pub mode: u32,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Device node path.
    pub path: PathBuf,
    /// String to store.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub data: Option<String>,
    /// Store the contents of a file as one string.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Append a trailing newline.
    #[arg(long)]
    pub newline: bool,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Device node path.
    pub path: PathBuf,
    /// Reader buffer size; longer strings are truncated to it.
    #[arg(long, default_value_t = DEFAULT_READ_CAPACITY)]
    pub capacity: usize,
}

#[derive(Args, Debug)]
pub struct DrainArgs {
    /// Device node path.
    pub path: PathBuf,
    /// Reader buffer size; longer strings are truncated to it.
    #[arg(long, default_value_t = DEFAULT_READ_CAPACITY)]
    pub capacity: usize,
    /// Stop after this many strings.
    #[arg(long)]
    pub max: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_mode(input: &str) -> Result<u32, String> {
    let digits = input
        .strip_prefix("0o")
        .or_else(|| input.strip_prefix("0O"))
        .unwrap_or(input);
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| format!("invalid octal mode: {input}"))?;
    if mode > 0o777 {
        return Err(format!("mode out of range: {input}"));
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode_accepts_octal_forms() {
        assert_eq!(parse_mode("0666").unwrap(), 0o666);
        assert_eq!(parse_mode("600").unwrap(), 0o600);
        assert_eq!(parse_mode("0o640").unwrap(), 0o640);
    }

    #[test]
    fn parse_mode_rejects_garbage() {
        assert!(parse_mode("rw-rw-rw-").is_err());
        assert!(parse_mode("0999").is_err());
        assert!(parse_mode("01777").is_err());
    }
}
