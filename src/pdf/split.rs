//! Extracting a selection of pages into a new document

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lopdf::Document;
use tracing::{debug, info};

use crate::error::{Error, Result};
use super::io::{load_unlocked_document, page_ids, save_document};
use super::merge::{install_page_tree, materialize_inherited_attributes};

/// 1-based page numbers in output order
///
/// Parsed from a comma separated list of numbers and inclusive ranges, such as
/// `1,3,5-7`. A descending range (`7-5`) lists its pages in reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection(Vec<u32>);

impl PageSelection {
    /// Select explicit page numbers
    pub fn new(pages: Vec<u32>) -> Result<Self> {
        if pages.is_empty() {
            return Err(Error::invalid("no pages selected"));
        }
        if pages.contains(&0) {
            return Err(Error::invalid("page numbers start at 1"));
        }
        Ok(Self(pages))
    }

    pub fn pages(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid(format!(
            "invalid page selection '{}': expected numbers and ranges like 1,3,5-7",
            s
        ));
        let number = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());

        let mut pages = Vec::new();
        for item in s.split(',') {
            match item.split_once('-') {
                Some((first, last)) => {
                    let (first, last) = (number(first)?, number(last)?);
                    if first <= last {
                        pages.extend(first..=last);
                    } else {
                        pages.extend((last..=first).rev());
                    }
                }
                None => pages.push(number(item)?),
            }
        }

        Self::new(pages)
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Build a document from the selected pages of `document`
///
/// Pages appear in selection order. Numbers past the last page are skipped;
/// a page selected more than once is copied, so each occurrence is its own
/// page object. Selecting only missing pages yields a document with no pages.
pub fn extract_pages(mut document: Document, selection: &PageSelection) -> Result<Document> {
    materialize_inherited_attributes(&mut document)?;
    let available = page_ids(&document);

    let mut used = BTreeSet::new();
    let mut chosen = Vec::with_capacity(selection.pages().len());
    for &number in selection.pages() {
        let Some(&page_id) = available.get(number as usize - 1) else {
            debug!(page = number, available = available.len(), "skipping page outside the document");
            continue;
        };

        if used.insert(page_id) {
            chosen.push(page_id);
        } else {
            let copy = document.get_object(page_id)?.clone();
            chosen.push(document.add_object(copy));
        }
    }

    install_page_tree(&mut document, &chosen);
    let pruned = document.prune_objects();
    debug!(pages = chosen.len(), pruned = pruned.len(), "extracted pages");

    Ok(document)
}

/// Write the selected pages of a PDF file to a new file
///
/// Returns the number of pages written.
///
/// # Example
///
/// ```no_run
/// use pdf_workbench::pdf::{split_pdf, PageSelection};
/// use std::path::Path;
///
/// let selection: PageSelection = "1,3-4".parse().unwrap();
/// split_pdf(Path::new("report.pdf"), Path::new("summary.pdf"), &selection)
///     .expect("Failed to split");
/// ```
pub fn split_pdf(input: &Path, output: &Path, selection: &PageSelection) -> Result<usize> {
    let document = load_unlocked_document(input)?;

    let mut extracted = extract_pages(document, selection)?;
    let page_count = page_ids(&extracted).len();

    extracted.compress();
    save_document(&mut extracted, output)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        selection = %selection,
        pages = page_count,
        "split document"
    );

    Ok(page_count)
}
