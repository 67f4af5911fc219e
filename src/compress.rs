//! Lossy recompression through an external optimizer
//!
//! The library never resamples images itself. A [`Recompressor`] rewrites a file
//! at a [`QualityTier`]; the bundled implementation shells out to Ghostscript's
//! `pdfwrite` device, whose `-dPDFSETTINGS` presets map onto the tiers.

use std::fmt;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;

use tempfile::Builder;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Environment variable overriding the Ghostscript binary
pub const GS_BINARY_ENV: &str = "PDF_WORKBENCH_GS";

/// Compression aggressiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    /// Screen resolution (72 dpi), smallest files
    Low,
    /// Ebook resolution (150 dpi)
    Medium,
    /// Print resolution (300 dpi)
    High,
}

impl QualityTier {
    /// Ghostscript `-dPDFSETTINGS` preset for this tier
    pub fn pdf_settings(&self) -> &'static str {
        match self {
            QualityTier::Low => "/screen",
            QualityTier::Medium => "/ebook",
            QualityTier::High => "/printer",
        }
    }
}

impl FromStr for QualityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            _ => Err(Error::invalid(format!(
                "invalid quality setting '{}': must be 'low', 'medium', or 'high'",
                s
            ))),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Low => f.write_str("low"),
            QualityTier::Medium => f.write_str("medium"),
            QualityTier::High => f.write_str("high"),
        }
    }
}

/// Something that can rewrite a PDF at a given quality tier
pub trait Recompressor {
    /// Rewrite `input` into `output`
    fn recompress(&self, input: &Path, output: &Path, tier: QualityTier) -> Result<()>;
}

/// Recompression through the Ghostscript command-line tool
#[derive(Debug, Clone)]
pub struct GhostscriptRecompressor {
    /// Binary name or path
    pub binary: String,
}

impl GhostscriptRecompressor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    /// Binary from `PDF_WORKBENCH_GS`, falling back to the platform default
    pub fn from_env() -> Self {
        match std::env::var(GS_BINARY_ENV) {
            Ok(binary) if !binary.trim().is_empty() => Self::new(binary),
            _ => Self::default(),
        }
    }

    fn arguments(input: &Path, output: &Path, tier: QualityTier) -> Vec<String> {
        vec![
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            format!("-dPDFSETTINGS={}", tier.pdf_settings()),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            format!("-sOutputFile={}", output.display()),
            input.display().to_string(),
        ]
    }
}

impl Default for GhostscriptRecompressor {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("gswin64c")
        } else {
            Self::new("gs")
        }
    }
}

impl Recompressor for GhostscriptRecompressor {
    fn recompress(&self, input: &Path, output: &Path, tier: QualityTier) -> Result<()> {
        let args = Self::arguments(input, output, tier);
        debug!(binary = %self.binary, ?args, "running ghostscript");

        let result = Command::new(&self.binary).args(&args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolNotFound(self.binary.clone())
            } else {
                Error::Io(e)
            }
        })?;

        if !result.status.success() {
            return Err(Error::ToolExecutionFailed {
                tool: self.binary.clone(),
                status: result.status.to_string(),
                stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        Ok(())
    }
}

/// Recompress a PDF file
///
/// The recompressor writes into a temporary file next to `output`, which
/// replaces `output` only once the tool has succeeded.
pub fn compress_pdf(
    input: &Path,
    output: &Path,
    tier: QualityTier,
    recompressor: &dyn Recompressor,
) -> Result<()> {
    if !input.exists() {
        return Err(Error::SourceNotFound(input.to_path_buf()));
    }

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = Builder::new().suffix(".pdf").tempfile_in(dir)?;

    recompressor.recompress(input, temp.path(), tier)?;
    temp.persist(output).map_err(|e| Error::Io(e.error))?;

    let before = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);
    let after = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    info!(
        input = %input.display(),
        output = %output.display(),
        %tier,
        before,
        after,
        "recompressed document"
    );

    Ok(())
}
