//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::path::PathBuf;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::error::{Error, Result};
use super::io::{load_unlocked_document, page_ids, save_document};
use super::objects::{inherited_attribute, INHERITABLE_ATTRIBUTES};

/// Options for merging PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Concatenate the pages of several documents into one
///
/// Pages appear in input order. Each page keeps its own content and resources;
/// attributes it used to inherit from its old page tree are copied onto it
/// first, so it stays self-contained under the new flat `Pages` node. Source
/// catalogs, outlines and page trees are dropped.
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
pub fn assemble(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(Error::invalid("No input documents provided"));
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut merged_pages: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (index, mut doc) in documents.into_iter().enumerate() {
        materialize_inherited_attributes(&mut doc)?;

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages = page_ids(&doc);
        debug!(document = index, pages = pages.len(), "appending pages");
        merged_pages.extend(pages);

        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);

    // Keep new_object_id() above every id taken from the sources
    merged.max_id = max_id - 1;

    install_page_tree(&mut merged, &merged_pages);

    // Old catalogs and page tree nodes are unreachable now
    let pruned = merged.prune_objects();
    debug!(pruned = pruned.len(), "pruned unreachable objects");

    Ok(merged)
}

/// Merge multiple PDF files into a single PDF
///
/// Every input is loaded before anything is written; the first missing or
/// unreadable input aborts the merge and no output file is created. Returns the
/// number of pages in the merged document.
///
/// # Example
///
/// ```no_run
/// use pdf_workbench::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("1. first.pdf"),
///         PathBuf::from("2. second.pdf"),
///     ],
///     output_path: PathBuf::from("merged.pdf"),
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<usize> {
    if options.input_paths.is_empty() {
        return Err(Error::invalid("No input files provided"));
    }

    let mut documents: Vec<Document> = Vec::new();
    for path in &options.input_paths {
        documents.push(load_unlocked_document(path)?);
    }

    let mut merged = assemble(documents)?;
    let page_count = page_ids(&merged).len();

    merged.compress();
    save_document(&mut merged, &options.output_path)?;

    info!(
        inputs = options.input_paths.len(),
        pages = page_count,
        output = %options.output_path.display(),
        "merged documents"
    );

    Ok(page_count)
}

/// Make `pages` the document's page tree, under a new flat `Pages` node and
/// a new catalog
///
/// The previous catalog is left in place for `prune_objects` to drop.
pub(crate) fn install_page_tree(doc: &mut Document, pages: &[ObjectId]) {
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = pages.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(pages.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in pages {
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }
}

/// Copy inherited page attributes (Resources, MediaBox, ...) onto each page
pub(crate) fn materialize_inherited_attributes(doc: &mut Document) -> Result<()> {
    for page_id in page_ids(doc) {
        let mut inherited: Vec<(&[u8], Object)> = Vec::new();
        {
            let page = doc.get_object(page_id)?.as_dict()?;
            for key in INHERITABLE_ATTRIBUTES {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = inherited_attribute(doc, page_id, key)? {
                    inherited.push((key, value.clone()));
                }
            }
        }

        if inherited.is_empty() {
            continue;
        }

        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}
