//! PDF output built directly on `lopdf` objects.

mod content;
mod document;
mod fonts;
mod resources;

pub use document::PdfBook;
pub use fonts::StandardFont;
