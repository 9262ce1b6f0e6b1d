use std::io::{IsTerminal, Write};
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sortbox_channel::EMPTY_REPLY;
use sortbox_store::MailboxStats;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CycleOutput<'a> {
    device: String,
    index: usize,
    size: usize,
    empty: bool,
    content: &'a str,
}

#[derive(Serialize)]
struct WriteOutput {
    device: String,
    written: usize,
}

/// Print the strings taken by one or more read cycles, in the order read.
pub fn print_cycles(device: &Path, cycles: &[Vec<u8>], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for (index, content) in cycles.iter().enumerate() {
                let preview = preview(content);
                let out = CycleOutput {
                    device: device.display().to_string(),
                    index,
                    size: content.len(),
                    empty: content.as_slice() == EMPTY_REPLY,
                    content: &preview,
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "SIZE", "CONTENT"]);
            for (index, content) in cycles.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    content.len().to_string(),
                    preview(content).escape_debug().to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (index, content) in cycles.iter().enumerate() {
                println!(
                    "#{index} size={} content={:?}",
                    content.len(),
                    preview(content)
                );
            }
        }
        OutputFormat::Raw => {
            for content in cycles {
                print_raw(content);
            }
        }
    }
}

pub fn print_write(device: &Path, written: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = WriteOutput {
                device: device.display().to_string(),
                written,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "WRITTEN"])
                .add_row(vec![device.display().to_string(), written.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("device={} written={written}", device.display());
        }
        OutputFormat::Raw => {}
    }
}

#[derive(Serialize)]
struct StatsOutput {
    device: String,
    #[serde(flatten)]
    stats: MailboxStats,
}

fn stats_json(device: &Path, stats: MailboxStats) -> String {
    let out = StatsOutput {
        device: device.display().to_string(),
        stats,
    };
    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
}

/// Print what a device still held when it stopped serving.
pub fn print_stats(device: &Path, stats: MailboxStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", stats_json(device, stats)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "CELLS", "BYTES"])
                .add_row(vec![
                    device.display().to_string(),
                    stats.cells.to_string(),
                    stats.bytes.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "device={} cells={} bytes={}",
                device.display(),
                stats.cells,
                stats.bytes
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn preview(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", content.len()),
    }
}
