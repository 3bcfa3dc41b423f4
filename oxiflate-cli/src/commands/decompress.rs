//! Decompress command implementation.

use crate::utils::{check_overwrite, create_progress_bar, decompressed_name, input_framing};
use filetime::FileTime;
use oxiflate_core::config::Framing;
use oxiflate_stream::FlateStream;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Options for decompressing a file.
pub struct DecompressOptions<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub framing: Option<Framing>,
    pub force: bool,
    pub progress: bool,
}

/// Summary of a finished decompression.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompressReport {
    pub output: PathBuf,
    pub framing: Framing,
    pub compressed: u64,
    pub size: u64,
    /// Modification time restored from the gzip header.
    pub mtime: Option<u32>,
}

pub fn cmd_decompress(options: &DecompressOptions<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let report = decompress_file(options)?;
    println!(
        "{} -> {} ({}): {} -> {} bytes",
        options.input.display(),
        report.output.display(),
        report.framing.name(),
        report.compressed,
        report.size
    );
    if let Some(mtime) = report.mtime {
        println!("  modification time restored: {} (Unix timestamp)", mtime);
    }
    Ok(())
}

pub fn decompress_file(
    options: &DecompressOptions<'_>,
) -> Result<DecompressReport, Box<dyn std::error::Error>> {
    let file = File::open(options.input)?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let framing = input_framing(&mut reader, options.input, options.framing)?;

    let output = match options.output {
        Some(path) => path.to_path_buf(),
        None => decompressed_name(options.input).ok_or_else(|| {
            format!(
                "cannot derive an output name from {}; use --output",
                options.input.display()
            )
        })?,
    };
    check_overwrite(&output, options.force)?;

    let pb = create_progress_bar(len, options.progress);
    let mut stream = FlateStream::decompressor(pb.wrap_read(reader), framing);
    let mut writer = BufWriter::new(File::create(&output)?);

    let copied = io::copy(&mut stream, &mut writer).and_then(|n| writer.flush().map(|()| n));
    drop(writer);
    let size = match copied {
        Ok(size) => size,
        Err(err) => {
            // Drop the partial output.
            let _ = fs::remove_file(&output);
            return Err(err.into());
        }
    };
    pb.finish_and_clear();

    let mtime = stream.header().map(|h| h.mtime).filter(|&m| m != 0);
    if let Some(mtime) = mtime {
        filetime::set_file_mtime(&output, FileTime::from_unix_time(i64::from(mtime), 0))?;
    }

    Ok(DecompressReport {
        output,
        framing,
        compressed: stream.total_in(),
        size,
        mtime,
    })
}
