//! Compress command implementation.

use crate::utils::{check_overwrite, compressed_name, create_progress_bar, savings};
use oxiflate_core::config::{FlateConfig, Framing, Strategy};
use oxiflate_stream::detect::framing_from_extension;
use oxiflate_stream::{FlateStream, GzipHeader};
use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Options for compressing a file.
pub struct CompressOptions<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub level: u8,
    pub framing: Option<Framing>,
    pub strategy: Strategy,
    pub window_bits: u8,
    pub mem_level: u8,
    pub force: bool,
    pub progress: bool,
}

/// Summary of a finished compression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressReport {
    pub output: PathBuf,
    pub framing: Framing,
    pub size: u64,
    pub compressed: u64,
}

pub fn cmd_compress(options: &CompressOptions<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let report = compress_file(options)?;
    println!(
        "{} -> {} ({}): {} -> {} bytes ({:.1}% saved)",
        options.input.display(),
        report.output.display(),
        report.framing.name(),
        report.size,
        report.compressed,
        savings(report.size, report.compressed)
    );
    Ok(())
}

pub fn compress_file(
    options: &CompressOptions<'_>,
) -> Result<CompressReport, Box<dyn std::error::Error>> {
    let framing = options
        .framing
        .or_else(|| options.output.and_then(framing_from_extension))
        .unwrap_or(Framing::Gzip);
    let output = options
        .output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| compressed_name(options.input, framing));

    let config = FlateConfig::new(framing)
        .with_level(options.level)
        .with_strategy(options.strategy)
        .with_window_bits(options.window_bits)
        .with_mem_level(options.mem_level);
    config.validate()?;
    check_overwrite(&output, options.force)?;

    let metadata = fs::metadata(options.input)?;
    let pb = create_progress_bar(metadata.len(), options.progress);
    let mut reader = pb.wrap_read(BufReader::new(File::open(options.input)?));
    let writer = BufWriter::new(File::create(&output)?);
    let mut stream = FlateStream::compressor(writer, &config)?
        .with_gzip_header(gzip_header(options.input, &metadata));

    io::copy(&mut reader, &mut stream)?;
    stream.finish()?;
    pb.finish_and_clear();

    Ok(CompressReport {
        output,
        framing,
        size: stream.total_in(),
        compressed: stream.total_out(),
    })
}

/// Gzip header carrying the input's name and modification time.
fn gzip_header(input: &Path, metadata: &Metadata) -> GzipHeader {
    let mut header = GzipHeader::new();
    if let Some(name) = input.file_name().and_then(|n| n.to_str()) {
        header = header.with_filename(name);
    }
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as u32);
    match mtime {
        Some(mtime) => header.with_mtime(mtime),
        None => header.with_mtime_now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_stream::{gzip_decompress, uncompress_buffer};

    fn options<'a>(input: &'a Path, output: Option<&'a Path>) -> CompressOptions<'a> {
        CompressOptions {
            input,
            output,
            level: 6,
            framing: None,
            strategy: Strategy::Default,
            window_bits: 15,
            mem_level: 8,
            force: false,
            progress: false,
        }
    }

    #[test]
    fn test_compress_defaults_to_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("words.txt");
        let data = b"words words words words words".repeat(50);
        fs::write(&input, &data).unwrap();

        let report = compress_file(&options(&input, None)).unwrap();
        assert_eq!(report.framing, Framing::Gzip);
        assert_eq!(report.output, dir.path().join("words.txt.gz"));
        assert_eq!(report.size, data.len() as u64);

        let gz = fs::read(&report.output).unwrap();
        assert_eq!(gz.len() as u64, report.compressed);
        assert_eq!(gzip_decompress(&gz).unwrap(), data);
        let (header, _) = GzipHeader::parse(&gz).unwrap();
        assert_eq!(header.filename.as_deref(), Some("words.txt"));
        assert_ne!(header.mtime, 0);
    }

    #[test]
    fn test_framing_from_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bin");
        fs::write(&input, b"zlib by extension").unwrap();
        let output = dir.path().join("out.zz");

        let report = compress_file(&options(&input, Some(&output))).unwrap();
        assert_eq!(report.framing, Framing::Zlib);
        let packed = fs::read(&output).unwrap();
        assert_eq!(
            uncompress_buffer(&packed, Framing::Zlib).unwrap(),
            b"zlib by extension"
        );
    }

    #[test]
    fn test_refuses_overwrite_and_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a");
        fs::write(&input, b"a").unwrap();
        let output = dir.path().join("a.gz");
        fs::write(&output, b"keep me").unwrap();

        assert!(compress_file(&options(&input, None)).is_err());
        assert_eq!(fs::read(&output).unwrap(), b"keep me");

        let mut opts = options(&input, None);
        opts.force = true;
        opts.window_bits = 8;
        assert!(compress_file(&opts).is_err());
        assert_eq!(fs::read(&output).unwrap(), b"keep me");

        opts.window_bits = 15;
        assert!(compress_file(&opts).is_ok());
    }
}
