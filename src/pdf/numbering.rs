//! Page numbers drawn at the foot of every page
//!
//! Each page gets its own small overlay: the page number in Helvetica, its
//! left edge at the horizontal middle of the media box and its baseline a fixed
//! distance above the bottom edge. The overlay goes through the same compositor
//! as watermarks, so page resources and content are never disturbed.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::layout::PageDimensions;
use super::font::{encode_text, helvetica_font};
use super::io::{load_unlocked_document, page_ids, save_document};
use super::objects::{inherited_attribute, resolve};
use super::overlay::Compositor;
use super::stamp::{Rgb, STAMP_FONT_KEY};

/// Options for numbering pages
#[derive(Debug, Clone)]
pub struct PageNumberOptions {
    /// Font size in points
    pub font_size: u32,
    /// Baseline height above the bottom of the media box, in points
    pub bottom_margin: f32,
    /// Number printed on the first page
    pub first_number: u32,
    /// Fill color of the digits
    pub color: Rgb,
}

impl Default for PageNumberOptions {
    fn default() -> Self {
        Self {
            font_size: 12,
            bottom_margin: 20.0,
            first_number: 1,
            color: Rgb { r: 0.0, g: 0.0, b: 0.0 },
        }
    }
}

impl PageNumberOptions {
    pub fn validate(&self) -> Result<()> {
        if self.font_size == 0 {
            return Err(Error::invalid("font size must be greater than 0"));
        }
        if !self.bottom_margin.is_finite() || self.bottom_margin < 0.0 {
            return Err(Error::invalid(format!(
                "bottom margin {} must be a non-negative number",
                self.bottom_margin
            )));
        }
        self.color.validate()
    }
}

/// Draw a page number on every page of a document
///
/// A document without pages is returned unchanged.
pub fn number_pages(mut document: Document, options: &PageNumberOptions) -> Result<Document> {
    options.validate()?;

    let pages = page_ids(&document);
    if pages.is_empty() {
        return Ok(document);
    }

    let font_id = document.add_object(Object::Dictionary(helvetica_font()));
    let mut fonts = Dictionary::new();
    fonts.set(STAMP_FONT_KEY, Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let mut compositor = Compositor::new(&mut document, resources);

    for (index, page_id) in pages.iter().copied().enumerate() {
        let number = u64::from(options.first_number) + index as u64;
        let [llx, lly, urx, _] = media_box(&document, page_id)?;
        let x = llx + (urx - llx) / 2.0;
        let y = lly + options.bottom_margin;

        let content = number_content(&number.to_string(), x, y, options);
        let renamed = compositor.paint(&mut document, page_id, &content)?;
        debug!(page = index, number, renamed, "numbered page");
    }

    Ok(document)
}

/// Number the pages of a PDF file
///
/// Options are validated before the input is opened. Returns the number of
/// pages numbered.
pub fn number_pdf(input: &Path, output: &Path, options: &PageNumberOptions) -> Result<usize> {
    options.validate()?;

    let document = load_unlocked_document(input)?;

    let mut numbered = number_pages(document, options)?;
    let page_count = page_ids(&numbered).len();

    numbered.compress();
    save_document(&mut numbered, output)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        pages = page_count,
        "numbered pages"
    );

    Ok(page_count)
}

/// The page's media box as `[llx lly urx ury]` with the corners normalized
///
/// Pages without a readable media box are treated as US Letter.
fn media_box(document: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let Some(object) = inherited_attribute(document, page_id, b"MediaBox")? else {
        return Ok(PageDimensions::letter().media_box());
    };

    let values: Vec<f32> = match resolve(document, object)? {
        Object::Array(items) => items
            .iter()
            .filter_map(|item| resolve(document, item).ok()?.as_float().ok())
            .collect(),
        _ => Vec::new(),
    };

    match values[..] {
        [x1, y1, x2, y2] => Ok([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]),
        _ => Ok(PageDimensions::letter().media_box()),
    }
}

fn number_content(text: &str, x: f32, y: f32, options: &PageNumberOptions) -> Content {
    let Rgb { r, g, b } = options.color;

    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![
                Object::Name(STAMP_FONT_KEY.as_bytes().to_vec()),
                Object::Integer(i64::from(options.font_size)),
            ]),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new("Tj", vec![Object::String(encode_text(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}
