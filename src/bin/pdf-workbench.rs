//! PDF Workbench CLI tool
//!
//! A command-line tool for watermarking, merging, splitting, rotating,
//! numbering, locking and compressing PDFs.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use glob::glob;
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pdf_workbench::compress::{compress_pdf, GhostscriptRecompressor, QualityTier};
use pdf_workbench::layout::PageDimensions;
use pdf_workbench::pdf::{
    extract_metadata, extract_metadata_with_password, images_to_pdf, lock_pdf, merge_pdfs,
    number_pdf, rotate_pdf, split_pdf, unlock_pdf, watermark_pdf, ImagePageOptions,
    MergeOptions, PageNumberOptions, PageSelection, Placement, Rgb, Rotation, StampOptions,
};

/// PDF Workbench - Watermark, merge, split, lock and compress PDFs
#[derive(Parser)]
#[command(name = "pdf-workbench")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Stamp a diagonal DRAFT watermark on every page
    pdf-workbench watermark report.pdf -o report-draft.pdf --text DRAFT

    # Merge numbered PDFs in order
    pdf-workbench merge -o handout.pdf \"[0-9]*.pdf\" appendix.pdf

    # Keep the cover and chapter two
    pdf-workbench split book.pdf -o excerpt.pdf --pages 1,12-30

    # Turn scanned photos into one PDF
    pdf-workbench from-images -o scans.pdf \"scan-*.jpg\"

    # Number the pages of a handout
    pdf-workbench page-numbers handout.pdf -o numbered.pdf

    # Password-protect a document
    pdf-workbench lock report.pdf -o locked.pdf --password s3cret

    # Shrink a scan for email
    pdf-workbench compress scan.pdf -o scan-small.pdf --quality low")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp a text watermark onto every page
    Watermark {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Watermark text
        #[arg(long)]
        text: String,

        /// Font size in points
        #[arg(long, default_value_t = 40)]
        font_size: u32,

        /// Text color as "r,g,b" with components in [0, 1]
        #[arg(long, default_value = "0.5,0.5,0.5")]
        color: String,

        /// Opacity in [0, 1]
        #[arg(long, default_value_t = 0.3)]
        opacity: f32,

        /// Placement: "diagonal" or "center"
        #[arg(long, default_value = "diagonal")]
        placement: String,

        /// Reference page size the watermark is centered on
        /// ("letter", "legal", "a4" or "WIDTHxHEIGHT" with an optional pt, in or mm unit)
        #[arg(long, default_value = "letter")]
        page_size: String,
    },

    /// Merge multiple PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Copy selected pages into a new PDF
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Pages to keep, in order, e.g. "1,3,5-7"; pages past the end are skipped
        #[arg(long)]
        pages: String,
    },

    /// Build a PDF from JPEG images, one per page
    FromImages {
        /// Input JPEG files (in order). Supports glob patterns like "*.jpg"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Page size ("letter", "legal", "a4", "WIDTHxHEIGHT[pt|in|mm]"),
        /// or "image" to size each page to its image
        #[arg(long, default_value = "a4")]
        page_size: String,
    },

    /// Set the rotation of every page
    Rotate {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Clockwise rotation in degrees, a multiple of 90
        #[arg(long, allow_hyphen_values = true)]
        degrees: String,
    },

    /// Print a page number at the foot of every page
    PageNumbers {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Font size in points
        #[arg(long, default_value_t = 12)]
        font_size: u32,

        /// Baseline height above the bottom edge, in points
        #[arg(long, default_value_t = 20.0)]
        bottom_margin: f32,

        /// Number printed on the first page
        #[arg(long, default_value_t = 1)]
        start: u32,
    },

    /// Password-protect a PDF
    Lock {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Password required to open the output
        #[arg(long)]
        password: String,
    },

    /// Remove password protection from a PDF
    Unlock {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Password of the input
        #[arg(long)]
        password: String,
    },

    /// Recompress a PDF through Ghostscript
    Compress {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Quality tier: "low", "medium" or "high"
        #[arg(long, default_value = "medium")]
        quality: String,

        /// Ghostscript binary (defaults to $PDF_WORKBENCH_GS, then gs)
        #[arg(long)]
        gs_binary: Option<String>,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,

        /// Password, to report page count and document info of a locked file
        #[arg(long)]
        password: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Watermark {
            input, output, text, font_size, color, opacity, placement, page_size,
        } => {
            cmd_watermark(input, output, text, font_size, color, opacity, placement, page_size)
        }
        Commands::Merge { inputs, output } => cmd_merge(inputs, output),
        Commands::Split { input, output, pages } => cmd_split(input, output, pages),
        Commands::FromImages { inputs, output, page_size } => {
            cmd_from_images(inputs, output, page_size)
        }
        Commands::Rotate { input, output, degrees } => cmd_rotate(input, output, degrees),
        Commands::PageNumbers { input, output, font_size, bottom_margin, start } => {
            cmd_page_numbers(input, output, font_size, bottom_margin, start)
        }
        Commands::Lock { input, output, password } => cmd_lock(input, output, password),
        Commands::Unlock { input, output, password } => cmd_unlock(input, output, password),
        Commands::Compress { input, output, quality, gs_binary } => {
            cmd_compress(input, output, quality, gs_binary)
        }
        Commands::Info { input, password } => cmd_info(input, password),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Expand glob patterns in input paths
///
/// Matches of one pattern are sorted; the patterns themselves keep the order
/// they were given in.
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => warn!("glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Stamp a watermark onto every page
#[allow(clippy::too_many_arguments)]
fn cmd_watermark(
    input: PathBuf,
    output: PathBuf,
    text: String,
    font_size: u32,
    color: String,
    opacity: f32,
    placement: String,
    page_size: String,
) -> Result<()> {
    let options = StampOptions {
        text,
        font_size,
        color: color.parse::<Rgb>()?,
        opacity,
        placement: placement.parse::<Placement>()?,
        page_size: page_size.parse::<PageDimensions>()?,
    };

    let pages = watermark_pdf(&input, &output, &options)?;

    println!("Watermarked {} pages: {}", pages, output.display());
    Ok(())
}

/// Merge multiple PDFs into one
fn cmd_merge(inputs: Vec<String>, output: PathBuf) -> Result<()> {
    let inputs = expand_globs(inputs)?;
    let count = inputs.len();

    let options = MergeOptions {
        input_paths: inputs,
        output_path: output.clone(),
    };

    let pages = merge_pdfs(&options)?;

    println!("Merged {} files ({} pages) to: {}", count, pages, output.display());
    Ok(())
}

/// Copy selected pages into a new PDF
fn cmd_split(input: PathBuf, output: PathBuf, pages: String) -> Result<()> {
    let selection = pages.parse::<PageSelection>()?;

    let written = split_pdf(&input, &output, &selection)?;

    println!("Wrote {} pages: {}", written, output.display());
    Ok(())
}

/// Build a PDF from images
fn cmd_from_images(inputs: Vec<String>, output: PathBuf, page_size: String) -> Result<()> {
    let page_size = if page_size.eq_ignore_ascii_case("image") {
        None
    } else {
        Some(page_size.parse::<PageDimensions>()?)
    };
    let inputs = expand_globs(inputs)?;

    let pages = images_to_pdf(&inputs, &output, &ImagePageOptions { page_size })?;

    println!("Converted {} images: {}", pages, output.display());
    Ok(())
}

/// Rotate every page
fn cmd_rotate(input: PathBuf, output: PathBuf, degrees: String) -> Result<()> {
    let rotation = degrees.parse::<Rotation>()?;

    let pages = rotate_pdf(&input, &output, rotation)?;

    println!("Rotated {} pages to {}: {}", pages, rotation, output.display());
    Ok(())
}

/// Number every page
fn cmd_page_numbers(
    input: PathBuf,
    output: PathBuf,
    font_size: u32,
    bottom_margin: f32,
    start: u32,
) -> Result<()> {
    let options = PageNumberOptions {
        font_size,
        bottom_margin,
        first_number: start,
        ..Default::default()
    };

    let pages = number_pdf(&input, &output, &options)?;

    println!("Numbered {} pages: {}", pages, output.display());
    Ok(())
}

/// Password-protect a PDF
fn cmd_lock(input: PathBuf, output: PathBuf, password: String) -> Result<()> {
    lock_pdf(&input, &output, &password)?;

    println!("Locked: {}", output.display());
    Ok(())
}

/// Remove password protection
fn cmd_unlock(input: PathBuf, output: PathBuf, password: String) -> Result<()> {
    unlock_pdf(&input, &output, &password)?;

    println!("Unlocked: {}", output.display());
    Ok(())
}

/// Recompress a PDF
fn cmd_compress(
    input: PathBuf,
    output: PathBuf,
    quality: String,
    gs_binary: Option<String>,
) -> Result<()> {
    let tier = quality.parse::<QualityTier>()?;
    let recompressor = match gs_binary {
        Some(binary) => GhostscriptRecompressor::new(binary),
        None => GhostscriptRecompressor::from_env(),
    };

    compress_pdf(&input, &output, tier, &recompressor)?;

    let before = std::fs::metadata(&input).map(|m| m.len())?;
    let after = std::fs::metadata(&output).map(|m| m.len())?;
    println!(
        "Compressed ({}): {} -> {} bytes: {}",
        tier,
        before,
        after,
        output.display()
    );
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf, password: Option<String>) -> Result<()> {
    let metadata = match password {
        Some(password) => extract_metadata_with_password(&input, &password)?,
        None => extract_metadata(&input)?,
    };

    println!("File: {}", input.display());
    match metadata.page_count {
        Some(pages) => println!("Pages: {}", pages),
        None => println!("Pages: unknown (password protected; pass --password)"),
    }
    println!("Encrypted: {}", if metadata.encrypted { "yes" } else { "no" });

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}
