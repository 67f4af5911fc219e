//! Page rotation

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lopdf::{Document, Object};
use tracing::info;

use crate::error::{Error, Result};
use super::io::{load_unlocked_document, page_ids, save_document};

/// A clockwise page rotation, normalized to 0, 90, 180 or 270 degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation(u16);

impl Rotation {
    /// Any multiple of 90 is accepted; `-90` and `450` both mean 270 and 90
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(Error::invalid(format!(
                "rotation must be a multiple of 90 degrees, got {}",
                degrees
            )));
        }
        Ok(Self(degrees.rem_euclid(360) as u16))
    }

    pub fn degrees(&self) -> u16 {
        self.0
    }
}

impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let degrees: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid(format!("invalid rotation '{}': expected degrees", s)))?;
        Self::from_degrees(degrees)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Set every page's `/Rotate` to `rotation`
///
/// The rotation replaces whatever the page had, including a value inherited
/// from its page tree; it is not added to it.
pub fn rotate_pages(mut document: Document, rotation: Rotation) -> Result<Document> {
    for page_id in page_ids(&document) {
        let page = document.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Rotate", Object::Integer(i64::from(rotation.degrees())));
    }
    Ok(document)
}

/// Rotate every page of a PDF file
///
/// Returns the number of pages rotated.
pub fn rotate_pdf(input: &Path, output: &Path, rotation: Rotation) -> Result<usize> {
    let document = load_unlocked_document(input)?;

    let mut rotated = rotate_pages(document, rotation)?;
    let page_count = page_ids(&rotated).len();

    rotated.compress();
    save_document(&mut rotated, output)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        rotation = %rotation,
        pages = page_count,
        "rotated document"
    );

    Ok(page_count)
}
