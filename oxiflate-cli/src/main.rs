//! OxiFlate CLI - zlib, gzip and raw DEFLATE from the command line.

mod commands;
mod utils;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use commands::{
    CompressOptions, DecompressOptions, cmd_compress, cmd_decompress, cmd_detect, cmd_info,
    cmd_test,
};
use oxiflate_core::config::{Framing, Strategy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oxiflate")]
#[command(author, version, about = "Pure Rust zlib / gzip / raw DEFLATE utility")]
#[command(long_about = "
OxiFlate compresses and decompresses single files with DEFLATE in zlib,
gzip or raw framing. The framing defaults from the file extension
(.gz, .zz/.zlib, .deflate) and, when decompressing, from the magic bytes.

Examples:
  oxiflate compress notes.txt
  oxiflate compress -l 9 -f zlib notes.txt -o notes.zz
  oxiflate decompress notes.txt.gz
  oxiflate test notes.txt.gz
  oxiflate info --json notes.txt.gz
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Output file (default: input plus the framing's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression level (0 = store, 9 = best)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Container framing (default: from the output extension, else gzip)
        #[arg(short, long, value_enum)]
        framing: Option<FramingArg>,

        /// Match-acceptance strategy
        #[arg(short, long, value_enum, default_value = "default")]
        strategy: StrategyArg,

        /// Window size in bits (9-15)
        #[arg(long, default_value_t = 15)]
        window_bits: u8,

        /// Memory level (1-9)
        #[arg(long, default_value_t = 8)]
        mem_level: u8,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,

        /// Show a progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        input: PathBuf,

        /// Output file (default: input without its extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Container framing (default: from the extension or magic bytes)
        #[arg(short, long, value_enum)]
        framing: Option<FramingArg>,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,

        /// Show a progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Test compressed file integrity
    #[command(alias = "t")]
    Test {
        /// Files to test
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Container framing (default: from the extension or magic bytes)
        #[arg(short, long, value_enum)]
        framing: Option<FramingArg>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a compressed file
    #[command(alias = "i")]
    Info {
        /// File to inspect
        input: PathBuf,

        /// Container framing (default: from the extension or magic bytes)
        #[arg(short, long, value_enum)]
        framing: Option<FramingArg>,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Detect the framing of a file from its magic bytes
    Detect {
        /// File to detect
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Container framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FramingArg {
    /// zlib (RFC 1950)
    Zlib,
    /// gzip (RFC 1952)
    Gzip,
    /// Raw DEFLATE, no header or trailer
    Raw,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Zlib => Framing::Zlib,
            FramingArg::Gzip => Framing::Gzip,
            FramingArg::Raw => Framing::Raw,
        }
    }
}

/// Match-acceptance strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Normal LZ77 matching
    Default,
    /// Favor literals for filtered data
    Filtered,
    /// Huffman coding only, no matches
    HuffmanOnly,
    /// Distance-one matches only
    Rle,
    /// Static Huffman codes only
    Fixed,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => Strategy::Default,
            StrategyArg::Filtered => Strategy::Filtered,
            StrategyArg::HuffmanOnly => Strategy::HuffmanOnly,
            StrategyArg::Rle => Strategy::Rle,
            StrategyArg::Fixed => Strategy::Fixed,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            framing,
            strategy,
            window_bits,
            mem_level,
            force,
            progress,
        } => cmd_compress(&CompressOptions {
            input: &input,
            output: output.as_deref(),
            level,
            framing: framing.map(Framing::from),
            strategy: strategy.into(),
            window_bits,
            mem_level,
            force,
            progress,
        }),
        Commands::Decompress {
            input,
            output,
            framing,
            force,
            progress,
        } => cmd_decompress(&DecompressOptions {
            input: &input,
            output: output.as_deref(),
            framing: framing.map(Framing::from),
            force,
            progress,
        }),
        Commands::Test {
            inputs,
            framing,
            verbose,
        } => cmd_test(&inputs, framing.map(Framing::from), verbose),
        Commands::Info {
            input,
            framing,
            json,
        } => cmd_info(&input, framing.map(Framing::from), json),
        Commands::Detect { file } => cmd_detect(&file),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "oxiflate", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
