//! Test command implementation.

use crate::utils::input_framing;
use oxiflate_core::config::Framing;
use oxiflate_stream::FlateStream;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Result of decoding one file to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestReport {
    pub framing: Framing,
    pub compressed: u64,
    pub size: u64,
}

pub fn cmd_test(
    inputs: &[PathBuf],
    framing: Option<Framing>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ok_count = 0usize;
    let mut errors: Vec<(String, String)> = Vec::new();

    for input in inputs {
        match test_file(input, framing) {
            Ok(report) => {
                ok_count += 1;
                if verbose {
                    println!(
                        "  OK: {} ({}, {} -> {} bytes)",
                        input.display(),
                        report.framing.name(),
                        report.compressed,
                        report.size
                    );
                }
            }
            Err(e) => {
                errors.push((input.display().to_string(), e.to_string()));
                if verbose {
                    println!("  FAILED: {} - {}", input.display(), e);
                }
            }
        }
    }

    println!();
    println!("Test results:");
    println!("  Total files: {}", inputs.len());
    println!("  OK: {}", ok_count);
    println!("  Failed: {}", errors.len());

    if !errors.is_empty() && !verbose {
        println!();
        println!("Errors:");
        for (name, err) in &errors {
            println!("  {}: {}", name, err);
        }
    }

    if !errors.is_empty() {
        std::process::exit(2);
    }

    println!();
    println!("All files OK");
    Ok(())
}

/// Decode `path` completely, checking the trailer.
pub fn test_file(
    path: &Path,
    framing: Option<Framing>,
) -> Result<TestReport, Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(path)?);
    let framing = input_framing(&mut reader, path, framing)?;
    let mut stream = FlateStream::decompressor(reader, framing);
    let size = io::copy(&mut stream, &mut io::sink())?;
    Ok(TestReport {
        framing,
        compressed: stream.total_in(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::config::FlateConfig;
    use oxiflate_core::error::{ErrorKind, FlateError};
    use oxiflate_stream::compress_buffer;
    use std::fs;

    #[test]
    fn test_good_files() {
        let dir = tempfile::tempdir().unwrap();
        let data = b"test command ".repeat(64);
        for (name, config) in [
            ("a.gz", FlateConfig::GZIP),
            ("b.zz", FlateConfig::ZLIB),
            ("c.deflate", FlateConfig::RAW),
        ] {
            let path = dir.path().join(name);
            let packed = compress_buffer(&data, &config).unwrap();
            fs::write(&path, &packed).unwrap();
            let report = test_file(&path, None).unwrap();
            assert_eq!(report.framing, config.framing);
            assert_eq!(report.size, data.len() as u64);
            assert_eq!(report.compressed, packed.len() as u64);
        }
    }

    #[test]
    fn test_damaged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damaged.zz");
        let mut packed = compress_buffer(b"checked by adler-32", &FlateConfig::ZLIB).unwrap();
        let n = packed.len();
        packed[n - 1] ^= 0x55;
        fs::write(&path, packed).unwrap();

        let err = test_file(&path, None).unwrap_err();
        let io_err = err.downcast_ref::<io::Error>().unwrap();
        let flate = FlateError::from_io_ref(io_err).unwrap();
        assert_eq!(flate.kind(), ErrorKind::Checksum);
    }

    #[test]
    fn test_wrong_framing_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.gz");
        fs::write(&path, compress_buffer(b"gzip", &FlateConfig::GZIP).unwrap()).unwrap();
        assert!(test_file(&path, Some(Framing::Zlib)).is_err());
    }
}
