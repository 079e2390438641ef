//! PDF content stream generation for page text.
//!
//! This module provides:
//! - Line wrapping to a fixed number of monospace cells
//! - Text rendering with the standard font and an optional CID font
//! - PDF content stream building
//! - String encoding for PDF (WinAnsi literals and UTF-16BE hex)

use anyhow::Result;
use std::io::Write;

/// Builder for one page's content stream
pub struct ContentBuilder {
    pub content_parts: Vec<String>,
    font_name: String,
    cid_font_name: Option<String>,
    font_size: f64,
}

impl ContentBuilder {
    pub fn new(font_name: &str, font_size: f64) -> Self {
        Self {
            content_parts: Vec::new(),
            font_name: font_name.to_string(),
            cid_font_name: None,
            font_size,
        }
    }

    /// Create a new ContentBuilder with CID font support
    pub fn new_with_cid_font(font_name: &str, cid_font_name: &str, font_size: f64) -> Self {
        Self {
            cid_font_name: Some(cid_font_name.to_string()),
            ..Self::new(font_name, font_size)
        }
    }

    /// Add one line of text with its baseline at (`x`, `y`)
    pub fn add_text(&mut self, value: &str, x: f64, y: f64) {
        if value.is_empty() {
            return;
        }

        let font_size = self.font_size;
        match &self.cid_font_name {
            Some(cid_font_name) if needs_cid_font(value) => {
                self.content_parts.push(format!(
                    "q BT 0 g /{} {} Tf {:.2} {:.2} Td <{}> Tj ET Q\n",
                    cid_font_name,
                    font_size,
                    x,
                    y,
                    encode_cid_text(value)
                ));
            }
            _ => {
                self.content_parts.push(format!(
                    "q BT 0 g /{} {} Tf {:.2} {:.2} Td ({}) Tj ET Q\n",
                    self.font_name,
                    font_size,
                    x,
                    y,
                    escape_pdf_string(value)
                ));
            }
        }
    }

    /// Build the final content bytes
    pub fn build_content_bytes(&self) -> Vec<u8> {
        self.content_parts.concat().into_bytes()
    }
}

/// Whether the text has characters outside printable ASCII
pub fn needs_cid_font(s: &str) -> bool {
    s.chars().any(|c| c > '\u{7F}')
}

/// WinAnsi byte for a character outside ASCII, if the encoding has one
fn win_ansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{A0}'..='\u{FF}' => c as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Escape a string for a WinAnsi literal
///
/// Non-ASCII characters the encoding has are written as octal escapes;
/// anything it lacks becomes `?`.
pub fn escape_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' => result.push_str(r"\("),
            ')' => result.push_str(r"\)"),
            '\\' => result.push_str(r"\\"),
            '\t' => result.push_str(r"\t"),
            ' '..='~' => result.push(c),
            _ => match win_ansi_byte(c) {
                Some(byte) => result.push_str(&format!("\\{:03o}", byte)),
                None => result.push('?'),
            },
        }
    }
    result
}

/// Encode text for CID font (Identity-H encoding)
///
/// Converts text to UTF-16BE and returns hex representation
pub fn encode_cid_text(s: &str) -> String {
    let mut buf = [0u16; 2];
    s.chars()
        .flat_map(|c| c.encode_utf16(&mut buf).to_vec())
        .map(|unit| format!("{:04X}", unit))
        .collect()
}

/// Compress data using zlib/flate2
pub fn compress_data(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Split a line into pieces of at most `max_chars` characters.
///
/// Breaks after the last space that fits; a run with no space is cut
/// hard at the limit. An empty line stays a single empty piece.
pub fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest: Vec<char> = line.chars().collect();

    while rest.len() > max_chars {
        let cut = rest[..=max_chars]
            .iter()
            .rposition(|c| *c == ' ')
            .filter(|&pos| pos > 0);

        match cut {
            Some(pos) => {
                pieces.push(rest[..pos].iter().collect());
                rest.drain(..=pos);
            }
            None => {
                pieces.push(rest[..max_chars].iter().collect());
                rest.drain(..max_chars);
            }
        }
    }

    pieces.push(rest.into_iter().collect());
    pieces
}
