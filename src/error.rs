//! Error types for the PDF workbench library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF workbench library
#[derive(Error, Debug)]
pub enum Error {
    /// Bad placement mode, empty document list, unknown quality tier, ...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Input path does not exist
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The file exists but could not be read as a PDF
    #[error("Cannot parse {} as PDF: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// The file exists but is not a JPEG image we can embed
    #[error("Cannot read {} as JPEG: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: jpeg_decoder::Error,
    },

    /// Decryption with the supplied password failed
    #[error("Incorrect password")]
    WrongPassword,

    /// External tool binary is not installed or not on PATH
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    /// External tool ran but exited unsuccessfully
    #[error("{tool} failed ({status}): {}", .stderr.trim())]
    ToolExecutionFailed {
        tool: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
