//! Settings loading and parsing.
//!
//! This module handles:
//! - Loading the optional settings JSON file
//! - Page geometry and font defaults matching a plain A4 Courier printout
//! - Dimension type with flexible deserialization (mm, cm, in, pt)

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::pdf::StandardFont;

/// Horizontal padding of the header box around the service name.
pub const HEADER_HORIZONTAL_PADDING: usize = 8;

/// Dimension value that can be specified as:
/// - A number (interpreted as points)
/// - A string with unit: e.g., "100 mm", "10 cm", "1 in" (inches)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension(pub f64);

impl Dimension {
    pub fn from_mm(mm: f64) -> Self {
        Dimension(mm * 72.0 / 25.4)
    }

    /// Convert to points (internal PDF unit)
    pub fn as_points(&self) -> f64 {
        self.0
    }
}

fn parse_dimension(value: &str) -> Result<Dimension, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| c.is_whitespace() || c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (num_str, unit) = value.split_at(split);
    let unit = unit.trim().to_lowercase();

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number in dimension: {}", num_str))?;

    // 1 inch = 72 points (PDF default unit)
    let points = match unit.as_str() {
        "" | "pt" | "point" | "points" => num,
        "mm" => num * 72.0 / 25.4,
        "cm" => num * 72.0 / 2.54,
        "in" | "inch" | "inches" => num * 72.0,
        _ => {
            return Err(format!(
                "unknown unit '{}'. Supported: mm, cm, in, pt",
                unit
            ));
        }
    };

    Ok(Dimension(points))
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DimensionVisitor;

        impl serde::de::Visitor<'_> for DimensionVisitor {
            type Value = Dimension;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number or a string with unit (e.g., \"4 mm\", \"1 cm\", \"1 in\")")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                parse_dimension(value).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(DimensionVisitor)
    }
}

/// Everything that shapes the generated pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub header_padding: usize,
    /// Name of one of the 14 standard PDF fonts, e.g. "Courier"
    pub font: String,
    pub font_size: f64,
    pub line_height: Dimension,
    pub page_width: Dimension,
    pub page_height: Dimension,
    /// Left, right and top margin
    pub margin: Dimension,
    /// Distance from the bottom edge at which text flows onto a new page
    pub bottom_margin: Dimension,
    /// Sort directory entries by name instead of keeping the listing order
    pub sort_entries: bool,
    pub compress: bool,
    /// Look up a system font for text the standard font cannot encode
    pub unicode_font: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_padding: HEADER_HORIZONTAL_PADDING,
            font: "Courier".to_string(),
            font_size: 9.0,
            line_height: Dimension::from_mm(4.0),
            page_width: Dimension::from_mm(210.0),
            page_height: Dimension::from_mm(297.0),
            margin: Dimension::from_mm(10.0),
            bottom_margin: Dimension::from_mm(20.0),
            sort_entries: true,
            compress: true,
            unicode_font: true,
        }
    }
}

impl Settings {
    pub fn standard_font(&self) -> Result<StandardFont> {
        StandardFont::from_name(&self.font)
            .with_context(|| format!("Unknown standard font: {}", self.font))
    }

    fn validate(&self) -> Result<()> {
        if self.header_padding == 0 {
            bail!("header_padding must be at least 1");
        }
        if self.font_size <= 0.0 || self.line_height.as_points() <= 0.0 {
            bail!("font_size and line_height must be positive");
        }
        let text_area = self.page_height.as_points()
            - self.margin.as_points()
            - self.bottom_margin.as_points();
        if text_area < self.line_height.as_points() {
            bail!("page is too small to hold a single line of text");
        }
        self.standard_font()?;
        Ok(())
    }
}

/// Load settings from a JSON file, or the defaults when no path is given
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open settings at {:?}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse settings at {:?}", path))?
        }
        None => Settings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dimension_from_number() {
        let dim: Dimension = serde_json::from_value(json!(100)).unwrap();
        assert_eq!(dim.as_points(), 100.0);
    }

    #[test]
    fn test_dimension_from_mm() {
        let dim: Dimension = serde_json::from_value(json!("4 mm")).unwrap();
        // 4 mm = 4 * 72 / 25.4 points ≈ 11.34
        assert!((dim.as_points() - 11.34).abs() < 0.01);
    }

    #[test]
    fn test_dimension_without_space() {
        let dim: Dimension = serde_json::from_value(json!("10pt")).unwrap();
        assert_eq!(dim.as_points(), 10.0);
        let dim: Dimension = serde_json::from_value(json!("1cm")).unwrap();
        assert!((dim.as_points() - 28.35).abs() < 0.01);
    }

    #[test]
    fn test_dimension_from_inches() {
        let dim: Dimension = serde_json::from_value(json!("  1 INCH ")).unwrap();
        assert_eq!(dim.as_points(), 72.0);
    }

    #[test]
    fn test_dimension_invalid() {
        assert!(serde_json::from_value::<Dimension>(json!("100 foo")).is_err());
        assert!(serde_json::from_value::<Dimension>(json!("abc mm")).is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.header_padding, 8);
        assert_eq!(settings.font_size, 9.0);
        assert!((settings.page_width.as_points() - 595.28).abs() < 0.01);
        assert!(settings.sort_entries);
    }

    #[test]
    fn test_partial_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "header_padding": 4, "line_height": "5 mm" }"#).unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.header_padding, 4);
        assert!((settings.line_height.as_points() - 14.17).abs() < 0.01);
        assert_eq!(settings.font, "Courier");
    }

    #[test]
    fn test_zero_padding_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "header_padding": 0 }"#).unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }

    #[test]
    fn test_unknown_font_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "font": "Comic Sans" }"#).unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_settings_file() {
        let err = load_settings(Some(Path::new("/nonexistent/settings.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to open settings"));
    }
}
