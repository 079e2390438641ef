//! Plain-text layout of a backup page.
//!
//! A page is a boxed header with the service name, one checklist row per
//! code and a footer stamped with the generation time:
//!
//! ```text
//! ---------------------
//! |       Gmail       |
//! ---------------------
//!
//! [ ] 111111
//! [ ] 222222
//!
//! Generated at 2024-05-01 12:00:00.000000
//! ```

use chrono::Local;
use std::path::Path;

use crate::source::BackupFile;

const CHECKBOX: &str = "[ ]";
const FOOTER_PREFIX: &str = "Generated at ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Service name shown in the header: the last path segment without its
/// extension. Both `/` and `\` count as separators.
pub fn service_name(path: &Path) -> String {
    let path = path.to_string_lossy();
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// Box the name between two dashed rules. The border is `2 * padding`
/// wider than the name; the inner margin is `padding - 1` spaces so the
/// bars line up with the rule ends.
pub fn make_header(name: &str, padding: usize) -> String {
    let dashes = "-".repeat(2 * padding + name.chars().count());
    let whitespace = " ".repeat(padding.saturating_sub(1));
    format!("{dashes}\n|{whitespace}{name}{whitespace}|\n{dashes}")
}

pub fn make_body(codes: &[String]) -> String {
    codes
        .iter()
        .map(|code| format!("{CHECKBOX} {code}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn make_footer() -> String {
    format!("{FOOTER_PREFIX}{}", Local::now().format(TIMESTAMP_FORMAT))
}

pub fn page_text(file: &BackupFile, padding: usize) -> String {
    let header = make_header(&file.name, padding);
    let body = make_body(&file.codes);
    let footer = make_footer();
    format!("{header}\n\n{body}\n\n{footer}")
}
