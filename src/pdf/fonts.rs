use anyhow::{Context, Result};
use fontdb::Database;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fs;
use ttf_parser::Face;

/// Standard PDF Type1 fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// Get the PDF BaseFont name for this font
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Parse a font name into a StandardFont
    pub fn from_name(name: &str) -> Option<StandardFont> {
        let name_lower = name.to_lowercase();
        match name_lower.as_str() {
            "helvetica" => Some(StandardFont::Helvetica),
            "helvetica-bold" => Some(StandardFont::HelveticaBold),
            "helvetica-oblique" => Some(StandardFont::HelveticaOblique),
            "helvetica-boldoblique" => Some(StandardFont::HelveticaBoldOblique),
            "times" | "times-roman" => Some(StandardFont::TimesRoman),
            "times-bold" => Some(StandardFont::TimesBold),
            "times-italic" => Some(StandardFont::TimesItalic),
            "times-bolditalic" => Some(StandardFont::TimesBoldItalic),
            "courier" => Some(StandardFont::Courier),
            "courier-bold" => Some(StandardFont::CourierBold),
            "courier-oblique" => Some(StandardFont::CourierOblique),
            "courier-boldoblique" => Some(StandardFont::CourierBoldOblique),
            _ => None,
        }
    }

    /// Advance width of one glyph as a fraction of the font size. Exact for
    /// the Courier family; an average for the proportional fonts.
    pub fn char_width(&self) -> f64 {
        match self {
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => 0.6,
            _ => 0.5,
        }
    }
}

/// Create a standard font in the PDF document
pub fn create_font(doc: &mut Document, font: StandardFont) -> ObjectId {
    let mut font_dict = Dictionary::new();
    font_dict.set("Type", "Font");
    font_dict.set("Subtype", "Type1");
    font_dict.set("BaseFont", font.base_font_name());
    font_dict.set("Encoding", "WinAnsiEncoding");

    doc.add_object(Object::Dictionary(font_dict))
}

/// A TrueType font program found on the system
pub struct UnicodeFont {
    pub data: Vec<u8>,
    pub family: String,
}

/// Build a CIDToGIDMap stream from font's cmap table
///
/// Text is written with Identity-H, so every CID is a BMP code point and
/// has to be mapped to the glyph ID the font uses for it.
fn build_cidtogid_map(face: &Face) -> Vec<u8> {
    const MAX_CID: u16 = 0xFFFF;
    let mut gid_map: Vec<u8> = Vec::with_capacity((MAX_CID as usize + 1) * 2);

    for cid in 0..=MAX_CID {
        // Surrogates are not chars; they map to .notdef
        let gid = char::from_u32(cid as u32)
            .and_then(|ch| face.glyph_index(ch))
            .map(|g| g.0)
            .unwrap_or(0);

        gid_map.extend_from_slice(&gid.to_be_bytes());
    }

    gid_map
}

/// Scale a value in font units to the 1000-unit glyph space of PDF
fn to_glyph_space(value: i32, units_per_em: u16) -> i64 {
    (value as f64 * 1000.0 / units_per_em as f64).round() as i64
}

/// Embed a CID-keyed font for text outside the standard encoding
///
/// This creates a Type0 font with a CIDFontType2 descendant. The default
/// width is taken from the digit zero so monospace fonts keep their pitch.
pub fn embed_cid_font(doc: &mut Document, font: &UnicodeFont) -> Result<ObjectId> {
    let face = Face::parse(&font.data, 0)
        .with_context(|| format!("Failed to parse font {}", font.family))?;
    let units_per_em = face.units_per_em();
    let font_name = font.family.replace(' ', "-");

    let default_width = face
        .glyph_index('0')
        .and_then(|gid| face.glyph_hor_advance(gid))
        .map(|advance| to_glyph_space(advance as i32, units_per_em))
        .unwrap_or(600);

    let mut cid_font = Dictionary::new();
    cid_font.set("Type", "Font");
    cid_font.set("Subtype", "CIDFontType2");
    cid_font.set("BaseFont", font_name.clone());
    cid_font.set("CIDSystemInfo", {
        let mut cid_system = Dictionary::new();
        cid_system.set("Registry", Object::String("Adobe".into(), StringFormat::Literal));
        cid_system.set("Ordering", Object::String("Identity".into(), StringFormat::Literal));
        cid_system.set("Supplement", 0i64);
        Object::Dictionary(cid_system)
    });
    cid_font.set("DW", default_width);

    let cidtogid_stream = Stream::new(Dictionary::new(), build_cidtogid_map(&face));
    let cidtogid_id = doc.add_object(cidtogid_stream);
    cid_font.set("CIDToGIDMap", Object::Reference(cidtogid_id));

    let bbox = face.global_bounding_box();
    let mut font_descriptor = Dictionary::new();
    font_descriptor.set("Type", "FontDescriptor");
    font_descriptor.set("FontName", font_name.clone());
    font_descriptor.set("Flags", if face.is_monospaced() { 5i64 } else { 4i64 });
    font_descriptor.set(
        "FontBBox",
        [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max]
            .into_iter()
            .map(|v| Object::Integer(to_glyph_space(v as i32, units_per_em)))
            .collect::<Vec<_>>(),
    );
    font_descriptor.set("ItalicAngle", 0i64);
    font_descriptor.set("Ascent", to_glyph_space(face.ascender() as i32, units_per_em));
    font_descriptor.set("Descent", to_glyph_space(face.descender() as i32, units_per_em));
    font_descriptor.set(
        "CapHeight",
        face.capital_height()
            .map(|h| to_glyph_space(h as i32, units_per_em))
            .unwrap_or(700),
    );
    font_descriptor.set("StemV", 80i64);

    let mut font_stream_dict = Dictionary::new();
    font_stream_dict.set("Length1", font.data.len() as i64);
    let font_stream_id = doc.add_object(Stream::new(font_stream_dict, font.data.clone()));
    font_descriptor.set("FontFile2", Object::Reference(font_stream_id));

    let descriptor_id = doc.add_object(Object::Dictionary(font_descriptor));
    cid_font.set("FontDescriptor", Object::Reference(descriptor_id));

    let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

    let mut type0_font = Dictionary::new();
    type0_font.set("Type", "Font");
    type0_font.set("Subtype", "Type0");
    type0_font.set("BaseFont", font_name);
    type0_font.set("Encoding", "Identity-H");
    type0_font.set("DescendantFonts", vec![Object::Reference(cid_font_id)]);

    Ok(doc.add_object(Object::Dictionary(type0_font)))
}

/// Families tried in order; monospace first so checklists stay aligned
const UNICODE_FONT_FAMILIES: &[&str] = &[
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
    "Courier New",
    "Menlo",
    "Consolas",
    "DejaVu Sans",
    "Noto Sans",
    "Arial Unicode MS",
];

/// Find a TrueType font on the system that can render non-ASCII text
///
/// Collections and CFF-flavoured OpenType fonts are passed over: the
/// embedding above only handles a single `glyf` font program.
pub fn find_unicode_font() -> Option<UnicodeFont> {
    let mut db = Database::new();
    db.load_system_fonts();

    let families = UNICODE_FONT_FAMILIES
        .iter()
        .map(|name| fontdb::Family::Name(*name))
        .chain(std::iter::once(fontdb::Family::Monospace));

    for family in families {
        let query = fontdb::Query {
            families: &[family],
            ..Default::default()
        };

        let Some(id) = db.query(&query) else {
            continue;
        };
        let Some((source, index)) = db.face_source(id) else {
            continue;
        };
        if index != 0 {
            continue;
        }

        let data = match source {
            fontdb::Source::File(path) => match fs::read(&path) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!("Skipping font {:?}: {}", path, e);
                    continue;
                }
            },
            fontdb::Source::Binary(data) => data.as_ref().as_ref().to_vec(),
            _ => continue,
        };

        if !is_embeddable(&data) {
            continue;
        }

        let family = db
            .face(id)
            .and_then(|info| info.families.first().map(|(name, _)| name.clone()))
            .unwrap_or_else(|| "UnicodeFont".to_string());
        return Some(UnicodeFont { data, family });
    }

    None
}

fn is_embeddable(data: &[u8]) -> bool {
    // TrueType collections start with the `ttcf` tag
    if data.starts_with(b"ttcf") {
        return false;
    }
    Face::parse(data, 0)
        .map(|face| face.tables().glyf.is_some())
        .unwrap_or(false)
}
