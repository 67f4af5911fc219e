//! Loading and saving documents
//!
//! Loads map lopdf failures onto the library's error kinds. Saves go through a
//! temporary file in the destination directory that is renamed into place, so a
//! failed operation never leaves a half-written output behind.

use std::path::Path;

use lopdf::encryption::DecryptionError;
use lopdf::{Document, ObjectId};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Load a PDF from disk
///
/// Files protected by a non-empty user password load with only their
/// `/Encrypt` dictionary; use [`load_document_with_password`] for those.
pub fn load_document(path: &Path) -> Result<Document> {
    let bytes = read_source(path)?;
    let doc = Document::load_mem(&bytes).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), pages = doc.get_pages().len(), "loaded document");
    Ok(doc)
}

/// Load a PDF from disk, decrypting it with `password`
///
/// The returned document is plaintext and no longer carries `/Encrypt`. An
/// unencrypted file loads as usual whatever the password.
pub fn load_document_with_password(path: &Path, password: &str) -> Result<Document> {
    let bytes = read_source(path)?;
    let doc = Document::load_mem_with_password(&bytes, password).map_err(|source| match source {
        lopdf::Error::InvalidPassword
        | lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => Error::WrongPassword,
        source => Error::Parse {
            path: path.to_path_buf(),
            source,
        },
    })?;

    debug!(
        path = %path.display(),
        pages = doc.get_pages().len(),
        decrypted = doc.was_encrypted(),
        "loaded document"
    );
    Ok(doc)
}

/// Load a PDF that must not need a password
///
/// Operations that rewrite page content refuse locked inputs instead of
/// silently producing a file that still cannot be opened.
pub(crate) fn load_unlocked_document(path: &Path) -> Result<Document> {
    let doc = load_document(path)?;
    if doc.is_encrypted() {
        return Err(Error::invalid(format!(
            "{} is password protected; unlock it first",
            path.display()
        )));
    }
    Ok(doc)
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read(path)?)
}

/// Save a document to `path`, replacing it atomically
pub fn save_document(doc: &mut Document, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    doc.save_to(temp.as_file_mut())?;
    temp.as_file_mut().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    debug!(path = %path.display(), "saved document");
    Ok(())
}

/// Page object ids in document order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}
