//! Watermark stamp construction
//!
//! A stamp is a single synthetic page holding only the watermark drawing
//! operators: Helvetica text in one RGB fill color, made translucent through an
//! `ExtGState`, positioned by one affine transform. It is computed once against a
//! reference page size and then reused unchanged for every page it is applied to.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::PageDimensions;
use super::font::{encode_text, helvetica_font, string_width};

/// Resource name of the stamp font
pub const STAMP_FONT_KEY: &str = "F1";

/// Resource name of the stamp opacity state
pub const STAMP_GSTATE_KEY: &str = "GS1";

/// Where the watermark text goes on the reference page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Centered on the page, rotated 45° counter-clockwise
    Diagonal,
    /// Centered on the page, no rotation
    Center,
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diagonal" => Ok(Placement::Diagonal),
            "center" => Ok(Placement::Center),
            _ => Err(Error::invalid(format!(
                "invalid watermark placement '{}': must be 'diagonal' or 'center'",
                s
            ))),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Diagonal => f.write_str("diagonal"),
            Placement::Center => f.write_str("center"),
        }
    }
}

/// An RGB fill color, each channel in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    /// Create a color, rejecting channels outside [0, 1]
    pub fn new(r: f32, g: f32, b: f32) -> Result<Self> {
        let color = Self { r, g, b };
        color.validate()?;
        Ok(color)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (name, value) in [("red", self.r), ("green", self.g), ("blue", self.b)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::invalid(format!(
                    "{} component {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for Rgb {
    type Err = Error;

    /// Parses `r,g,b` with each component in [0, 1]
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let invalid = || Error::invalid(format!("invalid color '{}': expected r,g,b", s));

        if parts.len() != 3 {
            return Err(invalid());
        }

        let mut channels = [0.0f32; 3];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Rgb::new(channels[0], channels[1], channels[2])
    }
}

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl TransformMatrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Move the origin to (tx, ty)
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self { e: tx, f: ty, ..Self::identity() }
    }

    /// Counter-clockwise rotation about the origin
    pub fn rotate_degrees(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self { a: cos, b: sin, c: -sin, d: cos, e: 0.0, f: 0.0 }
    }

    /// The transform that applies `self` first and then `next`
    pub fn then(&self, next: &TransformMatrix) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    /// Map a point through the transform
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Operands for a `cm` operator
    fn operands(&self) -> Vec<Object> {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .into_iter()
            .map(Object::Real)
            .collect()
    }
}

/// Options for building a watermark stamp
#[derive(Debug, Clone)]
pub struct StampOptions {
    /// Watermark text
    pub text: String,
    /// Font size in points
    pub font_size: u32,
    /// Fill color of the glyphs
    pub color: Rgb,
    /// Fill opacity, 0 = invisible, 1 = opaque
    pub opacity: f32,
    /// Placement on the reference page
    pub placement: Placement,
    /// Page geometry the stamp is computed against
    pub page_size: PageDimensions,
}

impl Default for StampOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 40,
            color: Rgb { r: 0.5, g: 0.5, b: 0.5 },
            opacity: 0.3,
            placement: Placement::Diagonal,
            page_size: PageDimensions::letter(),
        }
    }
}

impl StampOptions {
    /// Check every numeric option before anything is drawn
    pub fn validate(&self) -> Result<()> {
        if self.font_size == 0 {
            return Err(Error::invalid("font size must be greater than 0"));
        }
        self.color.validate()?;
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::invalid(format!(
                "opacity {} is outside [0, 1]",
                self.opacity
            )));
        }
        Ok(())
    }
}

/// A single-page overlay holding the watermark operators
#[derive(Debug, Clone)]
pub struct Stamp {
    document: Document,
    page_id: ObjectId,
    placement: Placement,
    page_size: PageDimensions,
    transform: TransformMatrix,
    text_width: f32,
}

impl Stamp {
    /// The backing single-page document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of the stamp page inside [`Stamp::document`]
    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Reference page size the stamp was computed against
    pub fn page_size(&self) -> PageDimensions {
        self.page_size
    }

    /// Placement transform emitted before the text
    pub fn transform(&self) -> TransformMatrix {
        self.transform
    }

    /// Rendered width of the text in points
    pub fn text_width(&self) -> f32 {
        self.text_width
    }

    /// Decoded content stream of the stamp page
    pub fn content(&self) -> Result<Vec<u8>> {
        Ok(self.document.get_page_content(self.page_id)?)
    }

    /// The stamp page's resource dictionary (one font, one graphics state)
    pub fn resources(&self) -> Result<&Dictionary> {
        let page = self.document.get_object(self.page_id)?.as_dict()?;
        Ok(page.get(b"Resources")?.as_dict()?)
    }

    /// Write the stamp out as a standalone PDF, for inspection
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut document = self.document.clone();
        super::io::save_document(&mut document, path)
    }
}

/// Build a watermark stamp
///
/// All options are validated first; nothing is constructed for invalid input.
///
/// # Example
///
/// ```
/// use pdf_workbench::pdf::{build_stamp, Placement, StampOptions};
///
/// let stamp = build_stamp(&StampOptions {
///     text: "DRAFT".to_string(),
///     placement: Placement::Center,
///     ..Default::default()
/// }).unwrap();
///
/// assert_eq!(stamp.document().get_pages().len(), 1);
/// ```
pub fn build_stamp(options: &StampOptions) -> Result<Stamp> {
    options.validate()?;

    let (center_x, center_y) = options.page_size.center();
    let transform = match options.placement {
        Placement::Diagonal => TransformMatrix::rotate_degrees(45.0)
            .then(&TransformMatrix::translate(center_x, center_y)),
        Placement::Center => TransformMatrix::translate(center_x, center_y),
    };

    let font_size = options.font_size as f32;
    let text_width = string_width(&options.text, font_size);

    debug!(
        placement = %options.placement,
        page_size = %options.page_size,
        text_width,
        "building watermark stamp"
    );

    let content = stamp_content(options, &transform, text_width);

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(Object::Dictionary(helvetica_font()));

    let mut gstate = Dictionary::new();
    gstate.set("Type", Object::Name(b"ExtGState".to_vec()));
    gstate.set("ca", Object::Real(options.opacity));
    gstate.set("CA", Object::Real(options.opacity));

    let mut fonts = Dictionary::new();
    fonts.set(STAMP_FONT_KEY, Object::Reference(font_id));
    let mut gstates = Dictionary::new();
    gstates.set(STAMP_GSTATE_KEY, Object::Dictionary(gstate));

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(gstates));

    let content_id = document.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(options.page_size.media_box().into_iter().map(Object::Real).collect()),
    );
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    let page_id = document.add_object(Object::Dictionary(page));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Count", Object::Integer(1));
    document.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = document.add_object(Object::Dictionary(catalog));
    document.trailer.set("Root", Object::Reference(catalog_id));

    Ok(Stamp {
        document,
        page_id,
        placement: options.placement,
        page_size: options.page_size,
        transform,
        text_width,
    })
}

/// Drawing operators for the stamp page
///
/// The text is drawn with its baseline on the local origin and shifted left by
/// half its width, so the placement transform alone decides where it lands.
fn stamp_content(options: &StampOptions, transform: &TransformMatrix, text_width: f32) -> Content {
    let Rgb { r, g, b } = options.color;

    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(STAMP_GSTATE_KEY.as_bytes().to_vec())]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("cm", transform.operands()),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![
                Object::Name(STAMP_FONT_KEY.as_bytes().to_vec()),
                Object::Integer(i64::from(options.font_size)),
            ]),
            Operation::new("Td", vec![Object::Real(-text_width / 2.0), Object::Integer(0)]),
            Operation::new("Tj", vec![Object::String(encode_text(&options.text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(placement: Placement) -> StampOptions {
        StampOptions {
            text: "DRAFT".to_string(),
            font_size: 40,
            color: Rgb::new(0.5, 0.5, 0.5).unwrap(),
            opacity: 0.3,
            placement,
            page_size: PageDimensions::letter(),
        }
    }

    fn operations(stamp: &Stamp) -> Vec<Operation> {
        Content::decode(&stamp.content().unwrap()).unwrap().operations
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_placement_parsing() {
        assert_eq!("diagonal".parse::<Placement>().unwrap(), Placement::Diagonal);
        assert_eq!(" Center ".parse::<Placement>().unwrap(), Placement::Center);

        let err = "top-left".parse::<Placement>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("top-left"));
    }

    #[test]
    fn test_rgb_parsing() {
        let color: Rgb = "0.5, 0.25,1".parse().unwrap();
        assert_eq!(color, Rgb { r: 0.5, g: 0.25, b: 1.0 });

        assert!("0.5,0.5".parse::<Rgb>().is_err());
        assert!("1.5,0,0".parse::<Rgb>().is_err());
        assert!("red,0,0".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_rotation_composes_with_translation() {
        let t = TransformMatrix::rotate_degrees(45.0).then(&TransformMatrix::translate(306.0, 396.0));
        let half = std::f32::consts::FRAC_1_SQRT_2;
        assert!(close(t.a, half) && close(t.b, half) && close(t.c, -half) && close(t.d, half));
        assert_eq!((t.e, t.f), (306.0, 396.0));

        // A point along the local x axis moves up and to the right
        let (x, y) = t.apply(100.0, 0.0);
        assert!(close(x, 306.0 + 70.71) && close(y, 396.0 + 70.71));
    }

    #[test]
    fn test_identity_then_is_noop() {
        let t = TransformMatrix::translate(3.0, 4.0);
        assert_eq!(TransformMatrix::identity().then(&t), t);
        assert_eq!(t.then(&TransformMatrix::identity()), t);
    }

    #[test]
    fn test_diagonal_stamp_is_rotated_about_page_center() {
        let stamp = build_stamp(&draft(Placement::Diagonal)).unwrap();
        let t = stamp.transform();
        assert!(close(t.b, std::f32::consts::FRAC_1_SQRT_2));
        assert_eq!(t.apply(0.0, 0.0), (306.0, 396.0));

        let ops = operations(&stamp);
        let cm = ops.iter().find(|op| op.operator == "cm").unwrap();
        assert_eq!(cm.operands.len(), 6);
        assert!(close(cm.operands[4].as_float().unwrap(), 306.0));
        assert!(close(cm.operands[5].as_float().unwrap(), 396.0));
    }

    #[test]
    fn test_center_stamp_is_unrotated_and_centered() {
        let stamp = build_stamp(&draft(Placement::Center)).unwrap();
        assert_eq!(stamp.transform(), TransformMatrix::translate(306.0, 396.0));

        let ops = operations(&stamp);
        let td = ops.iter().find(|op| op.operator == "Td").unwrap();
        let offset = td.operands[0].as_float().unwrap();
        assert!(close(offset, -stamp.text_width() / 2.0));
        assert!(close(stamp.text_width(), 133.32));

        // Left edge of the text run sits half its width left of the page center
        let (left, _) = stamp.transform().apply(offset, 0.0);
        assert!(close(left, 306.0 - 66.66));
    }

    #[test]
    fn test_stamp_draws_text_with_fill_color_and_opacity() {
        let stamp = build_stamp(&draft(Placement::Diagonal)).unwrap();
        let ops = operations(&stamp);
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, ["q", "gs", "rg", "cm", "BT", "Tf", "Td", "Tj", "ET", "Q"]);

        // No stroke or background painting
        assert!(!names.iter().any(|n| matches!(*n, "S" | "f" | "re" | "RG")));

        let tj = ops.iter().find(|op| op.operator == "Tj").unwrap();
        assert_eq!(tj.operands[0].as_str().unwrap(), b"DRAFT");

        let resources = stamp.resources().unwrap();
        let gstate = resources
            .get(b"ExtGState").unwrap().as_dict().unwrap()
            .get(STAMP_GSTATE_KEY.as_bytes()).unwrap().as_dict().unwrap();
        assert!(close(gstate.get(b"ca").unwrap().as_float().unwrap(), 0.3));
    }

    #[test]
    fn test_stamp_has_one_page_one_stream_one_font() {
        let stamp = build_stamp(&draft(Placement::Center)).unwrap();
        assert_eq!(stamp.document().get_pages().len(), 1);

        let page = stamp.document().get_object(stamp.page_id()).unwrap().as_dict().unwrap();
        assert!(page.get(b"Contents").unwrap().as_reference().is_ok());

        let fonts = stamp.resources().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.len(), 1);
    }

    #[test]
    fn test_media_box_follows_reference_size() {
        let mut options = draft(Placement::Center);
        options.page_size = PageDimensions::new(400.0, 300.0);
        let stamp = build_stamp(&options).unwrap();

        let page = stamp.document().get_object(stamp.page_id()).unwrap().as_dict().unwrap();
        let media_box: Vec<f32> = page.get(b"MediaBox").unwrap().as_array().unwrap()
            .iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(media_box, vec![0.0, 0.0, 400.0, 300.0]);
        assert_eq!(stamp.transform().apply(0.0, 0.0), (200.0, 150.0));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut options = draft(Placement::Center);
        options.font_size = 0;
        assert!(matches!(build_stamp(&options), Err(Error::InvalidArgument(_))));

        let mut options = draft(Placement::Center);
        options.opacity = 1.2;
        assert!(matches!(build_stamp(&options), Err(Error::InvalidArgument(_))));

        let mut options = draft(Placement::Center);
        options.color = Rgb { r: -0.1, g: 0.0, b: 0.0 };
        assert!(matches!(build_stamp(&options), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_opacity_is_allowed() {
        let mut options = draft(Placement::Diagonal);
        options.opacity = 0.0;
        let stamp = build_stamp(&options).unwrap();
        let gstates = stamp.resources().unwrap().get(b"ExtGState").unwrap().as_dict().unwrap();
        let gstate = gstates.get(STAMP_GSTATE_KEY.as_bytes()).unwrap().as_dict().unwrap();
        assert_eq!(gstate.get(b"ca").unwrap().as_float().unwrap(), 0.0);
        assert_eq!(gstate.get(b"CA").unwrap().as_float().unwrap(), 0.0);
    }

    #[test]
    fn test_empty_text_is_allowed() {
        let mut options = draft(Placement::Center);
        options.text = String::new();
        let stamp = build_stamp(&options).unwrap();
        assert_eq!(stamp.text_width(), 0.0);
    }

    #[test]
    fn test_save_writes_standalone_page() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stamp.pdf");

        build_stamp(&draft(Placement::Diagonal)).unwrap().save(&path).unwrap();

        let reloaded = Document::load(&path).unwrap();
        assert_eq!(reloaded.get_pages().len(), 1);
    }
}
