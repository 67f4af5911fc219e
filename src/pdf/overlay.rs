//! Compositing overlay content onto the pages of a document
//!
//! Each page keeps its own content, media box and rotation. The overlay's
//! content stream is appended after the page's content so it paints on top,
//! and the overlay's resources are merged into the page's own resource
//! dictionary. When an overlay resource name is already used by the page, the
//! overlay's entry is renamed and its content rewritten to match; the page's
//! names never change. Watermark stamps and page numbers both go through here.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::Result;
use super::io::{load_unlocked_document, page_ids, save_document};
use super::objects::{
    collect_references, content_references, inherited_attribute, renumber_dictionary,
    renumber_object_references, resolve,
};
use super::stamp::{build_stamp, Stamp, StampOptions};

/// Overlay resource keys renamed for one page: (category, overlay key) -> page key
type Renames = BTreeMap<(Vec<u8>, Vec<u8>), Vec<u8>>;

/// Apply a stamp to every page of a document
///
/// Returns the document with the same pages in the same order. The stamp is
/// placed identically on every page, computed against its own reference size
/// rather than each page's media box. A document with no pages is returned as is.
pub fn apply_stamp(mut document: Document, stamp: &Stamp) -> Result<Document> {
    let pages = page_ids(&document);
    if pages.is_empty() {
        return Ok(document);
    }

    let stamp_resources = import_stamp_resources(&mut document, stamp)?;
    let stamp_content = Content::decode(&stamp.content()?)?;
    let mut compositor = Compositor::new(&mut document, stamp_resources);

    for (index, page_id) in pages.iter().copied().enumerate() {
        let renamed = compositor.paint_shared(&mut document, page_id, &stamp_content)?;
        debug!(page = index, renamed, "stamped page");
    }

    Ok(document)
}

/// Paints overlay content on top of the pages of one document
///
/// Each page's original content is wrapped in shared `q` / `Q` streams so an
/// unbalanced `cm` in it cannot displace the overlay. The overlay's resources
/// are merged into every page it paints.
pub(crate) struct Compositor {
    resources: Dictionary,
    save_id: ObjectId,
    restore_id: ObjectId,
    shared_id: Option<ObjectId>,
}

impl Compositor {
    /// `resources` must already reference objects of `document`
    pub(crate) fn new(document: &mut Document, resources: Dictionary) -> Self {
        let save_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let restore_id = document.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        Self {
            resources,
            save_id,
            restore_id,
            shared_id: None,
        }
    }

    /// Paint content that is the same on every page
    ///
    /// Pages that needed no renaming all reference one content stream.
    /// Returns the number of overlay resources renamed on this page.
    pub(crate) fn paint_shared(
        &mut self,
        document: &mut Document,
        page_id: ObjectId,
        content: &Content,
    ) -> Result<usize> {
        self.paint_page(document, page_id, content, true)
    }

    /// Paint content drawn for this page only
    pub(crate) fn paint(
        &mut self,
        document: &mut Document,
        page_id: ObjectId,
        content: &Content,
    ) -> Result<usize> {
        self.paint_page(document, page_id, content, false)
    }

    fn paint_page(
        &mut self,
        document: &mut Document,
        page_id: ObjectId,
        content: &Content,
        share: bool,
    ) -> Result<usize> {
        let mut resources = effective_resources(document, page_id)?;
        let renames = merge_resources(&mut resources, &self.resources);

        let overlay_id = match self.shared_id {
            Some(id) if share && renames.is_empty() => id,
            _ if renames.is_empty() => {
                let id = document.add_object(Stream::new(Dictionary::new(), content.encode()?));
                if share {
                    self.shared_id = Some(id);
                }
                id
            }
            _ => {
                let renamed = rename_operands(content, &renames);
                document.add_object(Stream::new(Dictionary::new(), renamed.encode()?))
            }
        };

        let mut contents = content_references(document, page_id)?;
        if !contents.is_empty() {
            contents.insert(0, Object::Reference(self.save_id));
            contents.push(Object::Reference(self.restore_id));
        }
        contents.push(Object::Reference(overlay_id));

        let page = document.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));

        Ok(renames.len())
    }
}

/// Watermark a PDF file
///
/// The stamp is built before the input is opened, so invalid options fail
/// without touching the filesystem. Returns the number of pages watermarked.
///
/// # Example
///
/// ```no_run
/// use pdf_workbench::pdf::{watermark_pdf, StampOptions};
/// use std::path::Path;
///
/// let options = StampOptions {
///     text: "CONFIDENTIAL".to_string(),
///     ..Default::default()
/// };
///
/// watermark_pdf(Path::new("input.pdf"), Path::new("output.pdf"), &options)
///     .expect("Failed to watermark");
/// ```
pub fn watermark_pdf(input: &Path, output: &Path, options: &StampOptions) -> Result<usize> {
    let stamp = build_stamp(options)?;

    let document = load_unlocked_document(input)?;

    let mut stamped = apply_stamp(document, &stamp)?;
    let page_count = stamped.get_pages().len();

    stamped.compress();
    save_document(&mut stamped, output)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        pages = page_count,
        placement = %stamp.placement(),
        "watermarked document"
    );

    Ok(page_count)
}

/// Copy the objects the stamp's resources point at into `document`
///
/// Returns the stamp's resource dictionary rewritten to the new object ids.
fn import_stamp_resources(document: &mut Document, stamp: &Stamp) -> Result<Dictionary> {
    let source = stamp.document();
    let resources = stamp.resources()?;

    let mut reachable = BTreeSet::new();
    for (_, value) in resources.iter() {
        collect_references(source, value, &mut reachable);
    }

    let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for old_id in &reachable {
        id_map.insert(*old_id, document.new_object_id());
    }

    for (old_id, new_id) in &id_map {
        let object = source.get_object(*old_id)?;
        document.objects.insert(*new_id, renumber_object_references(object, &id_map));
    }

    Ok(renumber_dictionary(resources, &id_map))
}

/// The page's resources as one direct dictionary
///
/// Follows references and `Parent` inheritance, and resolves each category
/// (Font, XObject, ...) to a direct dictionary so it can be extended in place.
fn effective_resources(document: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let resources = match inherited_attribute(document, page_id, b"Resources")? {
        Some(object) => match resolve(document, object)? {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        None => Dictionary::new(),
    };

    let mut direct = Dictionary::new();
    for (category, value) in resources.iter() {
        direct.set(category.clone(), resolve(document, value)?.clone());
    }
    Ok(direct)
}

/// Union the overlay's resources into the page's
///
/// Entries the page already has win; a colliding overlay entry is stored under
/// the first free `<key>_<n>` instead.
fn merge_resources(page_resources: &mut Dictionary, overlay_resources: &Dictionary) -> Renames {
    let mut renames = Renames::new();

    for (category, overlay_value) in overlay_resources.iter() {
        let Object::Dictionary(overlay_entries) = overlay_value else {
            merge_plain_entry(page_resources, category, overlay_value);
            continue;
        };

        let page_has_dictionary = matches!(page_resources.get(category), Ok(Object::Dictionary(_)));
        if !page_has_dictionary {
            // Missing (or malformed, so unreferencable) category: take the overlay's as is
            page_resources.set(category.clone(), overlay_value.clone());
            continue;
        }

        if let Ok(Object::Dictionary(page_entries)) = page_resources.get_mut(category) {
            for (key, value) in overlay_entries.iter() {
                let target = if page_entries.has(key) {
                    let renamed = free_key(page_entries, key);
                    renames.insert((category.clone(), key.clone()), renamed.clone());
                    renamed
                } else {
                    key.clone()
                };
                page_entries.set(target, value.clone());
            }
        }
    }

    renames
}

/// Merge a non-dictionary resource entry such as `ProcSet`
fn merge_plain_entry(page_resources: &mut Dictionary, category: &[u8], overlay_value: &Object) {
    if !page_resources.has(category) {
        page_resources.set(category.to_vec(), overlay_value.clone());
        return;
    }

    if let (Ok(Object::Array(existing)), Object::Array(extra)) =
        (page_resources.get_mut(category), overlay_value)
    {
        for item in extra {
            let present = existing.iter().any(|o| o.as_name().ok() == item.as_name().ok());
            if !present {
                existing.push(item.clone());
            }
        }
    }
}

/// First `<key>_<n>` not present in `entries`
fn free_key(entries: &Dictionary, key: &[u8]) -> Vec<u8> {
    (1..)
        .map(|n| {
            let mut candidate = key.to_vec();
            candidate.extend_from_slice(format!("_{}", n).as_bytes());
            candidate
        })
        .find(|candidate| !entries.has(candidate))
        .unwrap_or_else(|| key.to_vec())
}

/// Resource category a content operator's first name operand refers to
fn operand_category(operator: &str) -> Option<&'static [u8]> {
    match operator {
        "Tf" => Some(b"Font"),
        "gs" => Some(b"ExtGState"),
        "Do" => Some(b"XObject"),
        "sh" => Some(b"Shading"),
        "cs" | "CS" => Some(b"ColorSpace"),
        _ => None,
    }
}

/// Rewrite resource names in overlay operators according to `renames`
fn rename_operands(content: &Content, renames: &Renames) -> Content {
    let operations = content
        .operations
        .iter()
        .map(|op| {
            let mut operands = op.operands.clone();
            if let (Some(category), Some(Object::Name(name))) =
                (operand_category(&op.operator), operands.first_mut())
            {
                if let Some(renamed) = renames.get(&(category.to_vec(), name.clone())) {
                    *name = renamed.clone();
                }
            }
            Operation::new(&op.operator, operands)
        })
        .collect();

    Content { operations }
}
