use anyhow::{Context, Result};
use chrono::Local;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;
use tracing::{debug, warn};

use super::content::{compress_data, needs_cid_font, wrap_line, ContentBuilder};
use super::fonts::{create_font, embed_cid_font, find_unicode_font, StandardFont};
use super::resources::{create_shared_resources, register_font};
use crate::config::{Dimension, Settings};

const FONT_NAME: &str = "F1";
const CID_FONT_NAME: &str = "F2";

/// Inner horizontal margin of the text box
const CELL_MARGIN_MM: f64 = 1.0;

/// Page geometry in points, PDF coordinates (origin bottom-left)
#[derive(Debug, Clone, Copy)]
struct Geometry {
    page_width: f64,
    page_height: f64,
    left: f64,
    top: f64,
    page_break: f64,
    line_height: f64,
    font_size: f64,
    max_chars: usize,
}

impl Geometry {
    fn new(settings: &Settings, font: StandardFont) -> Self {
        let page_width = settings.page_width.as_points();
        let page_height = settings.page_height.as_points();
        let margin = settings.margin.as_points();
        let cell_margin = Dimension::from_mm(CELL_MARGIN_MM).as_points();
        let text_width = page_width - 2.0 * margin - 2.0 * cell_margin;
        let cell_width = font.char_width() * settings.font_size;

        Self {
            page_width,
            page_height,
            left: margin + cell_margin,
            top: page_height - margin,
            page_break: settings.bottom_margin.as_points(),
            line_height: settings.line_height.as_points(),
            font_size: settings.font_size,
            max_chars: (text_width / cell_width).floor().max(1.0) as usize,
        }
    }

    /// Baseline of a line whose cell starts at `cell_top`, vertically
    /// centred in the cell
    fn baseline(&self, cell_top: f64) -> f64 {
        cell_top - self.line_height / 2.0 - 0.3 * self.font_size
    }
}

enum UnicodeFontState {
    Disabled,
    Unresolved,
    Missing,
    Loaded,
}

/// A PDF under construction: one or more physical pages per added text
pub struct PdfBook {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
    geometry: Geometry,
    unicode_font: UnicodeFontState,
    compress: bool,
}

impl PdfBook {
    pub fn new(settings: &Settings) -> Result<Self> {
        let font = settings.standard_font()?;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let resources_id = create_shared_resources(&mut doc);
        let font_id = create_font(&mut doc, font);
        register_font(&mut doc, resources_id, FONT_NAME, font_id);

        Ok(Self {
            doc,
            pages_id,
            resources_id,
            page_ids: Vec::new(),
            geometry: Geometry::new(settings, font),
            unicode_font: if settings.unicode_font {
                UnicodeFontState::Unresolved
            } else {
                UnicodeFontState::Disabled
            },
            compress: settings.compress,
        })
    }

    /// Number of physical pages written so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Lay out `text` from the top of a new page, one line per `\n`.
    /// Long lines wrap; text that runs past the bottom margin continues on
    /// another page.
    pub fn add_page(&mut self, text: &str) -> Result<()> {
        let use_cid = needs_cid_font(text) && self.ensure_unicode_font()?;
        let geometry = self.geometry;
        let new_builder = || {
            if use_cid {
                ContentBuilder::new_with_cid_font(FONT_NAME, CID_FONT_NAME, geometry.font_size)
            } else {
                ContentBuilder::new(FONT_NAME, geometry.font_size)
            }
        };

        let mut builder = new_builder();
        let mut cell_top = geometry.top;
        let mut at_page_start = true;

        for line in text.split('\n') {
            for piece in wrap_line(line, geometry.max_chars) {
                if !at_page_start && cell_top - geometry.line_height < geometry.page_break {
                    self.push_page(&builder)?;
                    builder = new_builder();
                    cell_top = geometry.top;
                }
                builder.add_text(&piece, geometry.left, geometry.baseline(cell_top));
                cell_top -= geometry.line_height;
                at_page_start = false;
            }
        }

        self.push_page(&builder)
    }

    fn ensure_unicode_font(&mut self) -> Result<bool> {
        match self.unicode_font {
            UnicodeFontState::Loaded => Ok(true),
            UnicodeFontState::Disabled => Ok(false),
            UnicodeFontState::Missing => Ok(false),
            UnicodeFontState::Unresolved => match find_unicode_font() {
                Some(font) => {
                    debug!("Embedding {} for non-ASCII text", font.family);
                    let font_id = embed_cid_font(&mut self.doc, &font)?;
                    register_font(&mut self.doc, self.resources_id, CID_FONT_NAME, font_id);
                    self.unicode_font = UnicodeFontState::Loaded;
                    Ok(true)
                }
                None => {
                    warn!("No embeddable Unicode font found; non-ASCII text will be approximated");
                    self.unicode_font = UnicodeFontState::Missing;
                    Ok(false)
                }
            },
        }
    }

    fn push_page(&mut self, builder: &ContentBuilder) -> Result<()> {
        let content = builder.build_content_bytes();
        let stream = if self.compress {
            let mut dict = Dictionary::new();
            dict.set("Filter", "FlateDecode");
            Stream::new(dict, compress_data(&content)?)
        } else {
            Stream::new(Dictionary::new(), content)
        };
        let content_id = self.doc.add_object(stream);

        let mut page = Dictionary::new();
        page.set("Type", "Page");
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("Resources", Object::Reference(self.resources_id));
        page.set("Contents", Object::Reference(content_id));

        let page_id = self.doc.add_object(Object::Dictionary(page));
        self.page_ids.push(page_id);
        debug!("Wrote page {}", self.page_ids.len());
        Ok(())
    }

    /// Finish the page tree and write the document to `path`, returning the
    /// number of pages written. A book with no pages gets one blank page.
    pub fn save(mut self, path: &Path, title: &str) -> Result<usize> {
        if self.page_ids.is_empty() {
            self.push_page(&ContentBuilder::new(FONT_NAME, self.geometry.font_size))?;
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let mut pages = Dictionary::new();
        pages.set("Type", "Pages");
        pages.set("Count", kids.len() as i64);
        pages.set("Kids", kids);
        pages.set(
            "MediaBox",
            vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::from(self.geometry.page_width),
                Object::from(self.geometry.page_height),
            ],
        );
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", "Catalog");
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(Object::Dictionary(catalog));

        let mut info = Dictionary::new();
        info.set("Title", text_string(title));
        info.set(
            "Producer",
            Object::String(
                format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).into_bytes(),
                StringFormat::Literal,
            ),
        );
        info.set(
            "CreationDate",
            Object::String(
                Local::now().format("D:%Y%m%d%H%M%S").to_string().into_bytes(),
                StringFormat::Literal,
            ),
        );
        let info_id = self.doc.add_object(Object::Dictionary(info));

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        self.doc
            .save(path)
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(self.page_ids.len())
    }
}

/// Encode a document text string: plain literal for ASCII, UTF-16BE with
/// a byte order mark otherwise
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::String(s.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
