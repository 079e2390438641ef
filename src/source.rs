//! Reading backup code files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::layout::service_name;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The only error a batch recovers from
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
            _ => SourceError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// The codes of a single service, in file order.
#[derive(Debug, Clone)]
pub struct BackupFile {
    pub name: String,
    pub codes: Vec<String>,
}

impl BackupFile {
    pub fn read(path: &Path) -> Result<Self, SourceError> {
        Ok(Self {
            name: service_name(path),
            codes: extract_codes(path)?,
        })
    }
}

/// Read every line of `path`, trimmed. Blank lines are kept so each line
/// of the source ends up as its own checklist row.
pub fn extract_codes(path: &Path) -> Result<Vec<String>, SourceError> {
    let bytes = fs::read(path).map_err(|e| SourceError::from_io(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        SourceError::from_io(path, io::Error::new(io::ErrorKind::InvalidData, e))
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    // A lone `\r` ends a line too (classic Mac files)
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    Ok(text.lines().map(|line| line.trim().to_string()).collect())
}
