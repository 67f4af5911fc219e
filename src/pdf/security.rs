//! Password protection using lopdf's standard security handler

use std::path::Path;

use lopdf::encryption::{DecryptionError, EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, StringFormat};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use super::io::{load_document, load_document_with_password, save_document};

/// RC4 key length in bits
const KEY_LENGTH: usize = 128;

/// Encrypt a document with `password`
///
/// The same password is used as user and owner password, and all permissions
/// are granted; opening the file is what the password protects.
pub fn lock_document(mut doc: Document, password: &str) -> Result<Document> {
    if password.is_empty() {
        return Err(Error::invalid("password must not be empty"));
    }
    if doc.is_encrypted() {
        return Err(Error::invalid("document is already password protected"));
    }

    ensure_file_id(&mut doc);

    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: password,
        user_password: password,
        key_length: KEY_LENGTH,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)?;
    doc.encrypt(&state)?;

    Ok(doc)
}

/// Decrypt an in-memory document with `password`
///
/// This is for documents encrypted in this process, such as the result of
/// [`lock_document`]. Files read from disk are decrypted while loading by
/// [`unlock_pdf`]. A document that is not encrypted is returned unchanged.
pub fn unlock_document(mut doc: Document, password: &str) -> Result<Document> {
    if !doc.is_encrypted() {
        return Ok(doc);
    }

    doc.decrypt(password).map_err(|e| match e {
        lopdf::Error::InvalidPassword
        | lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => Error::WrongPassword,
        other => Error::Pdf(other),
    })?;

    Ok(doc)
}

/// Password-protect a PDF file
pub fn lock_pdf(input: &Path, output: &Path, password: &str) -> Result<()> {
    let mut doc = load_document(input)?;
    // Streams are compressed before encryption; ciphertext does not compress
    doc.compress();

    let mut locked = lock_document(doc, password)?;
    save_document(&mut locked, output)?;

    info!(input = %input.display(), output = %output.display(), "locked document");
    Ok(())
}

/// Remove password protection from a PDF file
pub fn unlock_pdf(input: &Path, output: &Path, password: &str) -> Result<()> {
    let mut unlocked = load_document_with_password(input, password)?;
    if unlocked.is_encrypted() {
        return Err(Error::WrongPassword);
    }
    unlocked.compress();
    save_document(&mut unlocked, output)?;

    info!(input = %input.display(), output = %output.display(), "unlocked document");
    Ok(())
}

/// Whether the PDF at `path` is encrypted
pub fn is_encrypted(path: &Path) -> Result<bool> {
    Ok(load_document(path)?.is_encrypted())
}

/// Give the trailer a file identifier if it has none
///
/// The RC4 key derivation mixes in the first `/ID` entry.
fn ensure_file_id(doc: &mut Document) {
    if doc.trailer.has(b"ID") {
        return;
    }

    let id = Uuid::new_v4().into_bytes().to_vec();

    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::metadata::count_pages;
    use lopdf::{Dictionary, Stream};
    use tempfile::TempDir;

    fn one_page_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m 10 10 l S".to_vec()));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", Object::Integer(1));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn test_empty_password_rejected() {
        let result = lock_document(one_page_document(), "");
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_file_id_added_once() {
        let mut doc = one_page_document();
        ensure_file_id(&mut doc);
        let first = doc.trailer.get(b"ID").unwrap().as_array().unwrap().clone();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].as_str().unwrap().len(), 16);

        ensure_file_id(&mut doc);
        let second = doc.trailer.get(b"ID").unwrap().as_array().unwrap();
        assert_eq!(first[0].as_str().unwrap(), second[0].as_str().unwrap());
    }

    #[test]
    fn test_file_ids_differ_between_documents() {
        let mut a = one_page_document();
        let mut b = one_page_document();
        ensure_file_id(&mut a);
        ensure_file_id(&mut b);

        let id = |doc: &Document| doc.trailer.get(b"ID").unwrap().as_array().unwrap()[0].clone();
        assert_ne!(id(&a).as_str().unwrap(), id(&b).as_str().unwrap());
    }

    #[test]
    fn test_in_memory_lock_unlock() {
        let locked = lock_document(one_page_document(), "secret").unwrap();

        let unlocked = unlock_document(locked, "secret").unwrap();
        assert!(!unlocked.is_encrypted());
        assert_eq!(unlocked.get_pages().len(), 1);
    }

    #[test]
    fn test_locked_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("plain.pdf");
        let locked = dir.path().join("locked.pdf");
        let unlocked = dir.path().join("unlocked.pdf");
        one_page_document().save(&input).unwrap();

        lock_pdf(&input, &locked, "secret").unwrap();
        assert!(is_encrypted(&locked).unwrap());
        assert_eq!(load_document(&locked).unwrap().get_pages().len(), 0);

        unlock_pdf(&locked, &unlocked, "secret").unwrap();
        assert!(!is_encrypted(&unlocked).unwrap());
        assert_eq!(count_pages(&unlocked).unwrap(), 1);

        let doc = load_document(&unlocked).unwrap();
        let page_id = doc.page_iter().next().unwrap();
        assert_eq!(doc.get_page_content(page_id).unwrap(), b"0 0 m 10 10 l S".to_vec());
    }

    #[test]
    fn test_locked_file_wrong_password() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("plain.pdf");
        let locked = dir.path().join("locked.pdf");
        let output = dir.path().join("out.pdf");
        one_page_document().save(&input).unwrap();
        lock_pdf(&input, &locked, "secret").unwrap();

        let result = unlock_pdf(&locked, &output, "wrong");
        assert!(matches!(result, Err(Error::WrongPassword)));
        assert!(!output.exists());
    }

    #[test]
    fn test_unencrypted_document_passes_through_unlock() {
        let doc = unlock_document(one_page_document(), "anything").unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_locked_document_reports_encrypted() {
        let locked = lock_document(one_page_document(), "secret").unwrap();
        assert!(locked.is_encrypted());
        assert!(matches!(
            lock_document(locked, "again"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
