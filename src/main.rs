//! Minimal CRONOS archive inspector.
//!
//! This binary is a demonstration consumer of the library, not part of the
//! core: it parses CLI arguments, opens a `.dat`/`.tad` pair, and prints
//! what the core hands back. It does not interpret table/field schema,
//! render HTML or delimited text, or manage output directories — those
//! layers are external collaborators this binary deliberately does not
//! implement.

use clap::{Parser, Subcommand};
use cronos_core::Archive;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cronos-core", version, about = "CRONOS .dat/.tad archive inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print container header fields and record count
    Info { container: PathBuf, index: PathBuf },
    /// Print one record's decoded bytes as a hex dump
    Record {
        container: PathBuf,
        index: PathBuf,
        /// 1-based record index
        number: u32,
    },
    /// Walk every descriptor and report touched/unreferenced byte ranges
    Dump { container: PathBuf, index: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    match Cli::parse().command {
        Commands::Info { container, index } => {
            let archive = Archive::open(&container, &index)?;
            println!("version:      {}", archive.version());
            println!("kod_enabled:  {}", archive.kod_enabled());
            println!("blocksize:    {:#06x}", archive.blocksize());
            println!("record_count: {}", archive.record_count());
        }

        Commands::Record { container, index, number } => {
            let mut archive = Archive::open(&container, &index)?;
            match archive.read_record(number)? {
                None => println!("record #{number}: deleted"),
                Some(bytes) => {
                    println!("record #{number}: {} byte(s)", bytes.len());
                    for chunk in bytes.chunks(16) {
                        println!("  {}", hex::encode(chunk));
                    }
                }
            }
        }

        Commands::Dump { container, index } => {
            let mut archive = Archive::open(&container, &index)?;
            let report = archive.dump()?;
            for entry in &report.entries {
                let status = if entry.deleted {
                    "deleted".to_string()
                } else if let Some(err) = &entry.error {
                    format!("error: {err}")
                } else {
                    format!(
                        "ext={} decomp={} preview={:?}",
                        entry.was_extended,
                        entry.was_decompressed,
                        String::from_utf8_lossy(&entry.preview)
                    )
                };
                println!(
                    "{:5}: offset={:#010x} len_flags={:#010x} chk={:#010x} {status}",
                    entry.index, entry.offset, entry.length_and_flags, entry.checksum
                );
            }
            println!("{}", report.summary());
            for (start, end) in &report.unreferenced_ranges {
                println!("unreferenced: {start:#010x}-{end:#010x}");
            }
        }
    }

    Ok(())
}
