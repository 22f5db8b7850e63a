//! Platter CLI - disk-image checksums
//!
//! Reports CRC-32 values over whole files and individual sectors using the
//! fastest CRC backend this CPU supports.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::{cmd_backends, cmd_checksum, cmd_sectors, cmd_verify};
use platter_core::BackendPreference;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "platter")]
#[command(author, version, about = "Disk-image preservation checksums")]
#[command(long_about = "
Platter computes CRC-32 checksums over disk images, whole or per sector,
folding 64-byte blocks with carry-less multiplication where the CPU allows.

Environment:
  PLATTER_CRC32_FORCE   auto, hardware, soft-fold or table
  PLATTER_CHUNK_SIZE    streaming read size in bytes
  PLATTER_SECTOR_SIZE   default sector size in bytes

Examples:
  platter checksum disk.img
  platter checksum --json --backend table a.img b.img
  platter verify disk.img 0x758d6336
  platter sectors floppy.img --sector-size 512 --start 0 --count 18
  platter backends
")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the CRC-32 of each file
    #[command(alias = "c")]
    Checksum {
        /// Files to checksum
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// CRC backend (auto, hardware, soft-fold, table)
        #[arg(short, long)]
        backend: Option<BackendPreference>,

        /// Bytes read per step (multiple of 64)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Check a file against an expected CRC-32
    Verify {
        /// File to check
        file: PathBuf,

        /// Expected CRC-32 in hex (with or without 0x)
        expected: String,

        /// CRC backend (auto, hardware, soft-fold, table)
        #[arg(short, long)]
        backend: Option<BackendPreference>,
    },

    /// Print per-sector CRC-32 values of a disk image
    #[command(alias = "s")]
    Sectors {
        /// Disk image
        image: PathBuf,

        /// Bytes per sector
        #[arg(short = 's', long)]
        sector_size: Option<usize>,

        /// First sector (LBA)
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Number of sectors (to the end of the image if omitted)
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// CRC backend (auto, hardware, soft-fold, table)
        #[arg(short, long)]
        backend: Option<BackendPreference>,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// List CRC backends and which one is selected
    Backends {
        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Checksum {
            files,
            backend,
            chunk_size,
            json,
            progress,
        } => cmd_checksum(&files, backend, chunk_size, json, progress),
        Commands::Verify {
            file,
            expected,
            backend,
        } => cmd_verify(&file, &expected, backend),
        Commands::Sectors {
            image,
            sector_size,
            start,
            count,
            backend,
            json,
        } => cmd_sectors(&image, sector_size, start, count, backend, json),
        Commands::Backends { json } => cmd_backends(json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
