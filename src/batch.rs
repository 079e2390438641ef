//! Turning backup files into a PDF, one file or a whole folder at a time.
//!
//! Missing sources are reported on the console and skipped. Every other
//! failure aborts the run and nothing is written.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Settings;
use crate::layout::{page_text, service_name};
use crate::pdf::PdfBook;
use crate::source::{BackupFile, SourceError};

const SOURCE_EXTENSION: &str = ".txt";
const OUTPUT_EXTENSION: &str = ".pdf";

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Written { path: PathBuf, pages: usize },
    Skipped,
}

/// Append `extension` unless the path already ends with it
fn with_extension(path: &str, extension: &str) -> PathBuf {
    if path.ends_with(extension) {
        PathBuf::from(path)
    } else {
        PathBuf::from(format!("{path}{extension}"))
    }
}

fn report_missing(console: &mut impl Write, path: &dyn std::fmt::Display) -> Result<()> {
    warn!("Skipping {}: not found", path);
    writeln!(console, "Ignoring {} as it does not exist", path)?;
    Ok(())
}

fn finish(book: PdfBook, output: &Path, console: &mut impl Write) -> Result<Outcome> {
    let pages = book.save(output, &service_name(output))?;
    info!("Saved {:?} with {} pages", output, pages);
    writeln!(console, "Saved {} with {} page(s)", output.display(), pages)?;
    Ok(Outcome::Written {
        path: output.to_path_buf(),
        pages,
    })
}

/// Render a single backup file into its own PDF
pub fn backup_file(
    input: &str,
    output: &str,
    settings: &Settings,
    console: &mut impl Write,
) -> Result<Outcome> {
    let source = with_extension(input, SOURCE_EXTENSION);
    let file = match BackupFile::read(&source) {
        Ok(file) => file,
        Err(SourceError::NotFound(_)) => {
            report_missing(console, &input)?;
            return Ok(Outcome::Skipped);
        }
        Err(e) => return Err(e.into()),
    };
    info!("Read {} codes for {}", file.codes.len(), file.name);

    let mut book = PdfBook::new(settings)?;
    book.add_page(&page_text(&file, settings.header_padding))
        .with_context(|| format!("Failed to render {:?}", source))?;

    finish(book, &with_extension(output, OUTPUT_EXTENSION), console)
}

/// The `.txt` files directly inside `dir`, sorted by name when `sort` is set
pub fn discover_sources(dir: &Path, sort: bool) -> Result<Vec<PathBuf>, SourceError> {
    let entries = fs::read_dir(dir).map_err(|e| SourceError::from_io(dir, e))?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SourceError::from_io(dir, e))?;
        if !entry.file_name().to_string_lossy().ends_with(SOURCE_EXTENSION) {
            continue;
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        sources.push(entry.path());
    }

    if sort {
        sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }
    Ok(sources)
}

/// Render every `.txt` file of a folder into one PDF, a page per file
pub fn backup_directory(
    dir: &str,
    output: &str,
    settings: &Settings,
    console: &mut impl Write,
) -> Result<Outcome> {
    let sources = match discover_sources(Path::new(dir), settings.sort_entries) {
        Ok(sources) => sources,
        Err(SourceError::NotFound(_)) => {
            report_missing(console, &dir)?;
            return Ok(Outcome::Skipped);
        }
        Err(e) => return Err(e.into()),
    };
    info!("Found {} backup files in {}", sources.len(), dir);

    let mut book = PdfBook::new(settings)?;
    for source in &sources {
        let file = match BackupFile::read(source) {
            Ok(file) => file,
            Err(SourceError::NotFound(_)) => {
                report_missing(console, &source.display())?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        info!("Read {} codes for {}", file.codes.len(), file.name);

        book.add_page(&page_text(&file, settings.header_padding))
            .with_context(|| format!("Failed to render {:?}", source))?;
    }

    finish(book, &with_extension(output, OUTPUT_EXTENSION), console)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;

    fn test_settings() -> Settings {
        Settings {
            compress: false,
            unicode_font: false,
            ..Settings::default()
        }
    }

    fn page_contents(path: &Path) -> Vec<String> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
            .collect()
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("out", ".pdf"), PathBuf::from("out.pdf"));
        assert_eq!(with_extension("out.pdf", ".pdf"), PathBuf::from("out.pdf"));
        assert_eq!(with_extension("codes/Gmail", ".txt"), PathBuf::from("codes/Gmail.txt"));
    }

    #[test]
    fn test_single_file_appends_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Gmail.txt"), "111111\n222222\n").unwrap();
        let mut console = Vec::new();

        let outcome = backup_file(
            path_str(&dir.path().join("Gmail")),
            path_str(&dir.path().join("out")),
            &test_settings(),
            &mut console,
        )
        .unwrap();

        let output = dir.path().join("out.pdf");
        assert_eq!(outcome, Outcome::Written { path: output.clone(), pages: 1 });
        assert!(output.exists());

        let pages = page_contents(&output);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("(|       Gmail       |) Tj"));
        assert!(pages[0].contains("([ ] 111111) Tj"));
        assert!(pages[0].contains("([ ] 222222) Tj"));
        assert!(pages[0].contains("(Generated at "));
    }

    #[test]
    fn test_single_file_missing_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Nope");
        let mut console = Vec::new();

        let outcome = backup_file(
            path_str(&input),
            path_str(&dir.path().join("out")),
            &test_settings(),
            &mut console,
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!dir.path().join("out.pdf").exists());
        let console = String::from_utf8(console).unwrap();
        assert_eq!(
            console,
            format!("Ignoring {} as it does not exist\n", input.display())
        );
    }

    #[test]
    fn test_single_file_rerun_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Gmail.txt");
        let output = dir.path().join("out.pdf");
        fs::write(&input, "111111\n").unwrap();

        let mut console = Vec::new();
        backup_file(path_str(&input), path_str(&output), &test_settings(), &mut console).unwrap();
        fs::write(&input, "999999\n").unwrap();
        backup_file(path_str(&input), path_str(&output), &test_settings(), &mut console).unwrap();

        let pages = page_contents(&output);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("([ ] 999999) Tj"));
        assert!(!pages[0].contains("111111"));
    }

    #[test]
    fn test_directory_one_page_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let codes = dir.path().join("codes");
        fs::create_dir(&codes).unwrap();
        fs::write(codes.join("Gmail.txt"), "111111\n222222\n").unwrap();
        fs::write(codes.join("GitHub.txt"), "333333\n").unwrap();
        fs::write(codes.join("notes.md"), "not a backup\n").unwrap();
        fs::create_dir(codes.join("nested.txt")).unwrap();
        let mut console = Vec::new();

        let outcome = backup_directory(
            path_str(&codes),
            path_str(&dir.path().join("out")),
            &test_settings(),
            &mut console,
        )
        .unwrap();

        let output = dir.path().join("out.pdf");
        assert_eq!(outcome, Outcome::Written { path: output.clone(), pages: 2 });

        let pages = page_contents(&output);
        assert_eq!(pages.len(), 2);
        // Sorted by file name: GitHub before Gmail
        assert!(pages[0].contains("GitHub"));
        assert_eq!(pages[0].matches("([ ] ").count(), 1);
        assert!(pages[0].contains("([ ] 333333) Tj"));
        assert!(pages[1].contains("Gmail"));
        assert_eq!(pages[1].matches("([ ] ").count(), 2);
        assert!(pages[1].contains("([ ] 111111) Tj"));
        assert!(pages[1].contains("([ ] 222222) Tj"));
    }

    #[test]
    fn test_directory_missing_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut console = Vec::new();

        let outcome = backup_directory(
            path_str(&missing),
            path_str(&dir.path().join("out")),
            &test_settings(),
            &mut console,
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!dir.path().join("out.pdf").exists());
        assert!(String::from_utf8(console).unwrap().starts_with("Ignoring "));
    }

    #[test]
    fn test_directory_without_sources_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        let mut console = Vec::new();

        let outcome = backup_directory(
            path_str(&empty),
            path_str(&dir.path().join("out.pdf")),
            &test_settings(),
            &mut console,
        )
        .unwrap();

        assert_eq!(
            outcome,
            Outcome::Written { path: dir.path().join("out.pdf"), pages: 1 }
        );
        assert!(String::from_utf8(console).unwrap().contains("with 1 page(s)"));
        assert_eq!(page_contents(&dir.path().join("out.pdf")).len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_skips_vanished_file() {
        let dir = tempfile::tempdir().unwrap();
        let codes = dir.path().join("codes");
        fs::create_dir(&codes).unwrap();
        fs::write(codes.join("A.txt"), "111111\n").unwrap();
        // Listed by the directory scan, gone by the time it is read
        std::os::unix::fs::symlink(codes.join("deleted.txt"), codes.join("B.txt")).unwrap();
        let mut console = Vec::new();

        let outcome = backup_directory(
            path_str(&codes),
            path_str(&dir.path().join("out")),
            &test_settings(),
            &mut console,
        )
        .unwrap();

        assert_eq!(
            outcome,
            Outcome::Written { path: dir.path().join("out.pdf"), pages: 1 }
        );
        let console = String::from_utf8(console).unwrap();
        assert!(console.contains(&format!(
            "Ignoring {} as it does not exist",
            codes.join("B.txt").display()
        )));
        let pages = page_contents(&dir.path().join("out.pdf"));
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("([ ] 111111) Tj"));
    }

    #[test]
    fn test_discover_sources_unsorted_keeps_all() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.txt"] {
            fs::write(dir.path().join(name), "x\n").unwrap();
        }

        let mut names: Vec<_> = discover_sources(dir.path(), false)
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        let sorted = discover_sources(dir.path(), true).unwrap();
        assert_eq!(sorted[0].file_name().unwrap(), "a.txt");
        assert_eq!(sorted[2].file_name().unwrap(), "c.txt");
    }
}
