//! PDF manipulation module

pub mod font;
pub mod images;
pub mod io;
pub mod merge;
pub mod metadata;
pub mod numbering;
pub mod objects;
pub mod overlay;
pub mod rotate;
pub mod security;
pub mod split;
pub mod stamp;

// Re-export commonly used items
pub use images::{images_to_document, images_to_pdf, ImagePageOptions, JpegImage};
pub use io::{load_document, load_document_with_password, save_document};
pub use merge::{assemble, merge_pdfs, MergeOptions};
pub use metadata::{
    count_pages, document_metadata, extract_metadata, extract_metadata_with_password, PdfMetadata,
};
pub use numbering::{number_pages, number_pdf, PageNumberOptions};
pub use overlay::{apply_stamp, watermark_pdf};
pub use rotate::{rotate_pages, rotate_pdf, Rotation};
pub use security::{is_encrypted, lock_document, lock_pdf, unlock_document, unlock_pdf};
pub use split::{extract_pages, split_pdf, PageSelection};
pub use stamp::{build_stamp, Placement, Rgb, Stamp, StampOptions, TransformMatrix};
