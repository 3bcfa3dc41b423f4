//! Detect command implementation.

use oxiflate_stream::detect::{detect, extension, mime_type};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn cmd_detect(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let f = File::open(file)?;
    let mut reader = BufReader::new(f);

    let (framing, magic) = detect(&mut reader)?;

    println!("File: {}", file.display());
    match framing {
        Some(framing) => {
            println!("Framing: {}", framing.name());
            println!("Extension: .{}", extension(framing));
            println!("MIME type: {}", mime_type(framing));
        }
        None => println!("Framing: unknown (raw DEFLATE has no signature)"),
    }
    println!("Magic bytes: {:02X?}", &magic[..magic.len().min(16)]);

    Ok(())
}
