//! PDF metadata extraction

use std::path::Path;

use lopdf::Document;

use crate::error::{Error, Result};
use super::io::{load_document, load_document_with_password, page_ids};
use super::objects::resolve;

/// PDF metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfMetadata {
    /// Number of pages in the PDF; `None` while the page tree is still encrypted
    pub page_count: Option<usize>,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Whether the file is password protected
    pub encrypted: bool,
}

/// Read the metadata of an in-memory document
///
/// A document that is still encrypted has only its `/Encrypt` dictionary
/// readable, so page count, title and author are unknown. Documents decrypted
/// while loading report everything and are still flagged as encrypted.
pub fn document_metadata(doc: &Document) -> PdfMetadata {
    if doc.is_encrypted() {
        return PdfMetadata {
            page_count: None,
            title: None,
            author: None,
            encrypted: true,
        };
    }

    PdfMetadata {
        page_count: Some(page_ids(doc).len()),
        title: info_string(doc, b"Title"),
        author: info_string(doc, b"Author"),
        encrypted: doc.was_encrypted(),
    }
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let doc = load_document(path)?;
    Ok(document_metadata(&doc))
}

/// Extract metadata from a password-protected PDF file
pub fn extract_metadata_with_password(path: &Path, password: &str) -> Result<PdfMetadata> {
    let doc = load_document_with_password(path, password)?;
    Ok(document_metadata(&doc))
}

/// Count the number of pages in a PDF file
///
/// A document without pages counts as zero rather than an error. A file that
/// needs a password to open is an error, since its pages cannot be read.
pub fn count_pages(path: &Path) -> Result<usize> {
    let doc = load_document(path)?;
    if doc.is_encrypted() {
        return Err(Error::invalid(format!(
            "{} is password protected",
            path.display()
        )));
    }
    Ok(page_ids(&doc).len())
}

/// A text entry of the trailer's Info dictionary
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = resolve(doc, doc.trailer.get(b"Info").ok()?).ok()?.as_dict().ok()?;
    let value = resolve(doc, info.get(key).ok()?).ok()?;
    let text = lopdf::decode_text_string(value).ok()?;
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
