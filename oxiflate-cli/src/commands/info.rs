//! Info command implementation.

use crate::utils::savings;
use oxiflate_core::adler::Adler32;
use oxiflate_core::config::Framing;
use oxiflate_core::crc::Crc32;
use oxiflate_core::traits::Decompressor;
use oxiflate_deflate::ZlibHeader;
use oxiflate_stream::FrameDecoder;
use oxiflate_stream::detect::{framing_from_extension, framing_from_magic, mime_type};
use oxiflate_stream::gzip::GzipHeader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// zlib header fields.
#[derive(Debug, Serialize, Deserialize)]
struct ZlibJson {
    window_bits: u8,
    level_hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dictionary_id: Option<u32>,
}

/// gzip header fields.
#[derive(Debug, Serialize, Deserialize)]
struct GzipJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    mtime: u32,
    os: u8,
    extra_flags: u8,
    text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    header_crc: Option<u16>,
}

impl GzipJson {
    fn from_header(header: &GzipHeader) -> Self {
        Self {
            filename: header.filename.clone(),
            comment: header.comment.clone(),
            mtime: header.mtime,
            os: header.os,
            extra_flags: header.extra_flags,
            text: header.text,
            extra_len: header.extra.as_ref().map(Vec::len),
            header_crc: header.header_crc,
        }
    }
}

/// JSON output for the info command.
#[derive(Debug, Serialize, Deserialize)]
struct InfoJson {
    file: String,
    framing: String,
    mime_type: String,
    compressed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    uncompressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    savings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trailing_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zlib: Option<ZlibJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gzip: Option<GzipJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn cmd_info(
    input: &Path,
    framing: Option<Framing>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let framing = framing
        .or_else(|| framing_from_extension(input))
        .or_else(|| framing_from_magic(&data))
        .ok_or_else(|| {
            format!(
                "cannot tell the framing of {}; pass --framing",
                input.display()
            )
        })?;
    let info = inspect(input, &data, framing);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info(&info);
    }
    Ok(())
}

fn inspect(input: &Path, data: &[u8], framing: Framing) -> InfoJson {
    let mut info = InfoJson {
        file: input.display().to_string(),
        framing: framing.name().to_string(),
        mime_type: mime_type(framing).to_string(),
        compressed_size: data.len() as u64,
        uncompressed_size: None,
        savings: None,
        checksum: None,
        trailing_bytes: None,
        zlib: None,
        gzip: None,
        error: None,
    };

    match framing {
        Framing::Zlib => match ZlibHeader::parse(data) {
            Ok(header) => {
                info.zlib = Some(ZlibJson {
                    window_bits: header.window_bits,
                    level_hint: header.level.name().to_string(),
                    dictionary_id: header.dictionary_id,
                });
                if let Some(id) = header.dictionary_id {
                    info.error = Some(format!("needs preset dictionary {id:#010x}"));
                    return info;
                }
            }
            Err(e) => {
                info.error = Some(e.to_string());
                return info;
            }
        },
        Framing::Gzip => match GzipHeader::parse(data) {
            Ok((header, _)) => info.gzip = Some(GzipJson::from_header(&header)),
            Err(e) => {
                info.error = Some(e.to_string());
                return info;
            }
        },
        Framing::Raw => {}
    }

    let mut decoder = FrameDecoder::new(framing);
    match decoder.decompress_all(data) {
        Ok(plain) => {
            let size = plain.len() as u64;
            info.uncompressed_size = Some(size);
            info.savings = Some(savings(size, data.len() as u64));
            info.checksum = match framing {
                Framing::Zlib => Some(format!("adler32:{:08x}", Adler32::compute(&plain))),
                Framing::Gzip => Some(format!("crc32:{:08x}", Crc32::compute(&plain))),
                Framing::Raw => None,
            };
            let trailing = data.len() as u64 - decoder.total_in();
            info.trailing_bytes = (trailing > 0).then_some(trailing);
        }
        Err(e) => info.error = Some(e.to_string()),
    }
    info
}

fn print_info(info: &InfoJson) {
    println!("Compressed File Information");
    println!("===========================");
    println!("File: {}", info.file);
    println!("Framing: {}", info.framing);
    println!("MIME type: {}", info.mime_type);
    println!("Compressed size: {} bytes", info.compressed_size);
    if let Some(size) = info.uncompressed_size {
        println!("Uncompressed size: {} bytes", size);
    }
    if let Some(savings) = info.savings {
        println!("Space savings: {:.1}%", savings);
    }
    if let Some(checksum) = &info.checksum {
        println!("Checksum: {}", checksum);
    }
    if let Some(trailing) = info.trailing_bytes {
        println!("Trailing bytes after stream: {}", trailing);
    }

    if let Some(zlib) = &info.zlib {
        println!();
        println!("zlib Header:");
        println!("  Window: {} bits ({} bytes)", zlib.window_bits, 1u32 << zlib.window_bits);
        println!("  Level hint: {}", zlib.level_hint);
        if let Some(id) = zlib.dictionary_id {
            println!("  Dictionary id: {:#010x}", id);
        }
    }

    if let Some(gzip) = &info.gzip {
        println!();
        println!("GZIP Header:");
        if let Some(name) = &gzip.filename {
            println!("  Original filename: {}", name);
        }
        if let Some(comment) = &gzip.comment {
            println!("  Comment: {}", comment);
        }
        if gzip.mtime > 0 {
            println!("  Modification time: {} (Unix timestamp)", gzip.mtime);
        }
        println!("  OS: {}", gzip.os);
        println!("  Extra flags: {}", gzip.extra_flags);
        if gzip.text {
            println!("  Text: yes");
        }
        if let Some(len) = gzip.extra_len {
            println!("  Extra field: {} bytes", len);
        }
        if let Some(crc) = gzip.header_crc {
            println!("  Header CRC16: {:#06x}", crc);
        }
    }

    if let Some(error) = &info.error {
        println!();
        println!("Error: {}", error);
    }
}
