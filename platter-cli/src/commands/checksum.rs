//! Checksum command implementation.

use crate::utils::{create_progress_bar, format_crc, load_config};
use indicatif::ProgressBar;
use platter_core::{BackendPreference, Crc32, Crc32Dispatcher};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// One line of checksum output.
#[derive(Debug, Serialize)]
struct FileChecksum {
    path: String,
    crc32: String,
    bytes: u64,
}

/// Fill `buf` from `reader`, stopping short only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Stream `reader` through the dispatcher in full `chunk_size` chunks.
///
/// Returns the finalized CRC and the number of bytes read.
pub fn checksum_reader<R: Read>(
    mut reader: R,
    dispatcher: &Crc32Dispatcher,
    chunk_size: usize,
    pb: &ProgressBar,
) -> io::Result<(u32, u64)> {
    let mut buf = vec![0u8; chunk_size];
    let mut crc = Crc32::with_dispatcher(*dispatcher);
    let mut total = 0u64;

    loop {
        let n = read_chunk(&mut reader, &mut buf)?;
        crc.update(&buf[..n]);
        total += n as u64;
        pb.inc(n as u64);
        if n == 0 || n < buf.len() {
            break;
        }
    }

    Ok((crc.finalize(), total))
}

/// Stream a file through the dispatcher.
pub fn checksum_file(
    path: &Path,
    dispatcher: &Crc32Dispatcher,
    chunk_size: usize,
    pb: &ProgressBar,
) -> io::Result<(u32, u64)> {
    checksum_reader(File::open(path)?, dispatcher, chunk_size, pb)
}

pub fn cmd_checksum(
    files: &[PathBuf],
    backend: Option<BackendPreference>,
    chunk_size: Option<usize>,
    json: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(backend, chunk_size, None)?;
    let dispatcher = config.dispatcher();
    tracing::info!(backend = %dispatcher.backend(), files = files.len(), "checksumming");

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let len = std::fs::metadata(path)?.len();
        let pb = create_progress_bar(len, progress && !json);
        pb.set_message(path.display().to_string());

        let (crc, bytes) = checksum_file(path, &dispatcher, config.chunk_size, &pb)?;
        pb.finish_and_clear();

        if json {
            results.push(FileChecksum {
                path: path.display().to_string(),
                crc32: format_crc(crc),
                bytes,
            });
        } else {
            println!("{}  {}", format_crc(crc), path.display());
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}
