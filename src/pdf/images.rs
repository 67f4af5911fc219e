//! Building a PDF from JPEG images, one image per page
//!
//! JPEG data is embedded unchanged as a `DCTDecode` image XObject; only the
//! header is decoded, for the pixel size and color model.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use jpeg_decoder::{Decoder, PixelFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::layout::PageDimensions;
use super::io::{page_ids, save_document};
use super::merge::install_page_tree;

/// Resource name of the image on its page
const IMAGE_KEY: &str = "Im1";

/// Options for turning images into pages
#[derive(Debug, Clone)]
pub struct ImagePageOptions {
    /// Size of every page; `None` sizes each page to its image at 72 dpi
    pub page_size: Option<PageDimensions>,
}

impl Default for ImagePageOptions {
    fn default() -> Self {
        Self {
            page_size: Some(PageDimensions::a4()),
        }
    }
}

/// A JPEG file ready to be embedded
#[derive(Debug, Clone)]
pub struct JpegImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl JpegImage {
    /// Read a JPEG file and its header
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;

        let mut decoder = Decoder::new(Cursor::new(&data));
        decoder.read_info().map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let info = decoder
            .info()
            .ok_or_else(|| Error::invalid(format!("{} has no JPEG frame header", path.display())))?;

        if info.pixel_format == PixelFormat::L16 {
            return Err(Error::invalid(format!(
                "{}: 16-bit JPEG images are not supported",
                path.display()
            )));
        }

        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            format = ?info.pixel_format,
            "read image"
        );

        Ok(Self {
            data,
            width: u32::from(info.width),
            height: u32::from(info.height),
            pixel_format: info.pixel_format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The image XObject: the JPEG bytes behind a `DCTDecode` filter
    fn xobject(&self) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(i64::from(self.width)));
        dict.set("Height", Object::Integer(i64::from(self.height)));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

        let color_space: &[u8] = match self.pixel_format {
            PixelFormat::RGB24 => b"DeviceRGB",
            PixelFormat::CMYK32 => b"DeviceCMYK",
            _ => b"DeviceGray",
        };
        dict.set("ColorSpace", Object::Name(color_space.to_vec()));
        if self.pixel_format == PixelFormat::CMYK32 {
            // CMYK JPEGs are written inverted by most producers
            dict.set(
                "Decode",
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()),
            );
        }

        Stream::new(dict, self.data.clone())
    }
}

/// Scale and offset that fit `width` x `height` inside `page`, centered and
/// keeping the aspect ratio
fn fit_on_page(width: f32, height: f32, page: &PageDimensions) -> (f32, f32, f32, f32) {
    let (page_width, page_height) = (page.width.pt(), page.height.pt());
    let scale = (page_width / width).min(page_height / height);
    let (drawn_width, drawn_height) = (width * scale, height * scale);
    (
        drawn_width,
        drawn_height,
        (page_width - drawn_width) / 2.0,
        (page_height - drawn_height) / 2.0,
    )
}

/// Build a document with one page per image, in order
///
/// With a fixed page size each image is scaled to fit the page, centered, with
/// its aspect ratio kept. An empty list is an error.
pub fn images_to_document(images: &[JpegImage], options: &ImagePageOptions) -> Result<Document> {
    if images.is_empty() {
        return Err(Error::invalid("No input images provided"));
    }

    let mut document = Document::with_version("1.5");
    let mut pages = Vec::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        let (width, height) = (image.width as f32, image.height as f32);
        let page_size = options
            .page_size
            .unwrap_or_else(|| PageDimensions::new(width, height));
        let (drawn_width, drawn_height, x, y) = fit_on_page(width, height, &page_size);

        let image_id = document.add_object(image.xobject());

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("cm", vec![
                    Object::Real(drawn_width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(drawn_height),
                    Object::Real(x),
                    Object::Real(y),
                ]),
                Operation::new("Do", vec![Object::Name(IMAGE_KEY.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_KEY, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set(
            "MediaBox",
            Object::Array(page_size.media_box().into_iter().map(Object::Real).collect()),
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));
        pages.push(document.add_object(Object::Dictionary(page)));

        debug!(page = index, width = drawn_width, height = drawn_height, "placed image");
    }

    install_page_tree(&mut document, &pages);
    Ok(document)
}

/// Convert JPEG files into a PDF, one page per image
///
/// Every image is read before anything is written. Returns the page count.
pub fn images_to_pdf(inputs: &[PathBuf], output: &Path, options: &ImagePageOptions) -> Result<usize> {
    if inputs.is_empty() {
        return Err(Error::invalid("No input images provided"));
    }

    let images = inputs
        .iter()
        .map(|path| JpegImage::open(path))
        .collect::<Result<Vec<_>>>()?;

    let mut document = images_to_document(&images, options)?;
    let page_count = page_ids(&document).len();

    document.compress();
    save_document(&mut document, output)?;

    info!(
        inputs = inputs.len(),
        output = %output.display(),
        pages = page_count,
        "converted images"
    );

    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ColorType, ImageEncoder};
    use tempfile::TempDir;

    /// Write a solid-color JPEG of the given size
    fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32, color: ColorType) -> PathBuf {
        let channels = if color == ColorType::L8 { 1 } else { 3 };
        let pixels = vec![128u8; (width * height) as usize * channels];

        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, 90)
            .write_image(&pixels, width, height, color)
            .unwrap();

        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn xobject_dict(doc: &Document, index: usize) -> Dictionary {
        let page = doc.get_object(page_ids(doc)[index]).unwrap().as_dict().unwrap();
        let xobjects = page.get(b"Resources").unwrap().as_dict().unwrap()
            .get(b"XObject").unwrap().as_dict().unwrap();
        let id = xobjects.get(IMAGE_KEY.as_bytes()).unwrap().as_reference().unwrap();
        doc.get_object(id).unwrap().as_stream().unwrap().dict.clone()
    }

    #[test]
    fn test_open_reads_header() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "photo.jpg", 40, 20, ColorType::Rgb8);

        let image = JpegImage::open(&path).unwrap();
        assert_eq!((image.width(), image.height()), (40, 20));
    }

    #[test]
    fn test_open_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            JpegImage::open(&dir.path().join("none.jpg")),
            Err(Error::SourceNotFound(_))
        ));

        let bogus = dir.path().join("bogus.jpg");
        std::fs::write(&bogus, b"not a jpeg").unwrap();
        assert!(matches!(JpegImage::open(&bogus), Err(Error::Image { .. })));
    }

    #[test]
    fn test_one_page_per_image_with_color_space() {
        let dir = TempDir::new().unwrap();
        let images = vec![
            JpegImage::open(&write_jpeg(dir.path(), "a.jpg", 40, 20, ColorType::Rgb8)).unwrap(),
            JpegImage::open(&write_jpeg(dir.path(), "b.jpg", 10, 10, ColorType::L8)).unwrap(),
        ];

        let doc = images_to_document(&images, &ImagePageOptions::default()).unwrap();
        assert_eq!(page_ids(&doc).len(), 2);

        let first = xobject_dict(&doc, 0);
        assert_eq!(first.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert_eq!(first.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(first.get(b"Width").unwrap().as_i64().unwrap(), 40);
        let second = xobject_dict(&doc, 1);
        assert_eq!(second.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
    }

    #[test]
    fn test_image_fits_page_keeping_aspect_ratio() {
        let letter = PageDimensions::letter();
        let (w, h, x, y) = fit_on_page(200.0, 100.0, &letter);
        for (actual, expected) in [(w, 612.0), (h, 306.0), (x, 0.0), (y, 243.0)] {
            assert!((actual - expected).abs() < 0.01, "{actual} != {expected}");
        }
    }

    #[test]
    fn test_page_matches_image_without_page_size() {
        let dir = TempDir::new().unwrap();
        let image = JpegImage::open(&write_jpeg(dir.path(), "a.jpg", 300, 150, ColorType::Rgb8)).unwrap();

        let doc = images_to_document(&[image], &ImagePageOptions { page_size: None }).unwrap();
        let page = doc.get_object(page_ids(&doc)[0]).unwrap().as_dict().unwrap();
        let media_box: Vec<f32> = page.get(b"MediaBox").unwrap().as_array().unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 300.0, 150.0]);
    }

    #[test]
    fn test_empty_image_list_rejected() {
        let result = images_to_document(&[], &ImagePageOptions::default());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
