//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use oxiflate_core::config::Framing;
use oxiflate_stream::detect::{extension, framing_from_extension, framing_from_magic};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Create a byte-count progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Framing of a compressed input: explicit, else extension, else magic.
pub fn input_framing(
    reader: &mut BufReader<File>,
    path: &Path,
    explicit: Option<Framing>,
) -> Result<Framing, Box<dyn std::error::Error>> {
    if let Some(framing) = explicit.or_else(|| framing_from_extension(path)) {
        return Ok(framing);
    }
    let magic = reader.fill_buf()?;
    framing_from_magic(magic).ok_or_else(|| {
        format!(
            "cannot tell the framing of {}; pass --framing",
            path.display()
        )
        .into()
    })
}

/// Default name for a compressed file.
pub fn compressed_name(input: &Path, framing: Framing) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(extension(framing));
    PathBuf::from(name)
}

/// Default name for a decompressed file: the input without its
/// compression extension.
pub fn decompressed_name(input: &Path) -> Option<PathBuf> {
    framing_from_extension(input)?;
    let ext = input.extension()?.to_str()?.to_ascii_lowercase();
    if ext == "tgz" {
        return Some(input.with_extension("tar"));
    }
    Some(input.with_extension(""))
}

/// Percentage of space saved.
pub fn savings(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        (1.0 - compressed as f64 / original as f64) * 100.0
    }
}

/// Refuse to clobber an existing file unless forced.
pub fn check_overwrite(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !force && path.exists() {
        return Err(format!("{} already exists; use --force to overwrite", path.display()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_name() {
        assert_eq!(
            compressed_name(Path::new("dir/a.txt"), Framing::Gzip),
            PathBuf::from("dir/a.txt.gz")
        );
        assert_eq!(
            compressed_name(Path::new("a"), Framing::Zlib),
            PathBuf::from("a.zz")
        );
        assert_eq!(
            compressed_name(Path::new("a"), Framing::Raw),
            PathBuf::from("a.deflate")
        );
    }

    #[test]
    fn test_decompressed_name() {
        assert_eq!(
            decompressed_name(Path::new("a.txt.gz")),
            Some(PathBuf::from("a.txt"))
        );
        assert_eq!(
            decompressed_name(Path::new("b.ZLIB")),
            Some(PathBuf::from("b"))
        );
        assert_eq!(
            decompressed_name(Path::new("c.tgz")),
            Some(PathBuf::from("c.tar"))
        );
        assert_eq!(decompressed_name(Path::new("plain.txt")), None);
    }

    #[test]
    fn test_savings() {
        assert_eq!(savings(0, 20), 0.0);
        assert!((savings(100, 25) - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_check_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists");
        assert!(check_overwrite(&path, false).is_ok());
        std::fs::write(&path, b"x").unwrap();
        assert!(check_overwrite(&path, false).is_err());
        assert!(check_overwrite(&path, true).is_ok());
    }

    #[test]
    fn test_input_framing_from_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noext");
        std::fs::write(&path, oxiflate_stream::gzip_compress(b"m", 6).unwrap()).unwrap();
        let mut reader = BufReader::new(File::open(&path).unwrap());
        assert_eq!(input_framing(&mut reader, &path, None).unwrap(), Framing::Gzip);
        assert_eq!(
            input_framing(&mut reader, &path, Some(Framing::Raw)).unwrap(),
            Framing::Raw
        );

        let plain = dir.path().join("plain");
        std::fs::write(&plain, b"not compressed").unwrap();
        let mut reader = BufReader::new(File::open(&plain).unwrap());
        assert!(input_framing(&mut reader, &plain, None).is_err());
    }
}
