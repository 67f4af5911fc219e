//! PDF Workbench Library
//!
//! A cross-platform library for everyday PDF chores.
//! This library provides functionality to:
//! - Stamp a text watermark onto every page of a document
//! - Merge multiple PDF files
//! - Extract selected pages, rotate pages and add page numbers
//! - Password-protect and unlock documents
//! - Recompress documents through an external optimizer
//! - Extract metadata (page counts, etc.)
//!
//! # Example
//!
//! ```no_run
//! use pdf_workbench::pdf::{watermark_pdf, Placement, StampOptions};
//! use std::path::Path;
//!
//! let options = StampOptions {
//!     text: "DRAFT".to_string(),
//!     placement: Placement::Center,
//!     ..Default::default()
//! };
//!
//! watermark_pdf(Path::new("report.pdf"), Path::new("report-draft.pdf"), &options)
//!     .expect("Failed to watermark PDF");
//! ```

pub mod compress;
pub mod error;
pub mod layout;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, Result};
