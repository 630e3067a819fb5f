//! Struct archiving functionality
//!
//! An `Archiver` writes one CSV row per serialised record. Records must be
//! flat (no nested structs or sequences) so they map onto a single row.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
pub use csv::Writer;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot open the archive file: {0}")]
    FileOpenError(std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive file: {0}")]
    FlushError(std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::from_file(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given file, truncating it if it
    /// already exists. Parent directories are created as needed.
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, ArchiveError> {
        if let Some(parent) = file_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(ArchiveError::FileOpenError)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(file_path)
            .map_err(ArchiveError::FileOpenError)?;

        let w = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self { writer: Some(w) })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        match self.writer {
            Some(ref mut w) => {
                w.serialize(record).map_err(ArchiveError::WriteError)?;
                w.flush().map_err(ArchiveError::FlushError)
            }
            None => Err(ArchiveError::NotInitialised),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        joint: String,
        stuck: bool,
    }

    #[test]
    fn test_archiver_writes_header_and_rows() {
        let path = std::env::temp_dir()
            .join(format!("archive_test_{}", std::process::id()))
            .join("rows.csv");

        let mut arch = Archiver::from_file(&path).unwrap();
        arch.serialise(Row {
            time_s: 0.5,
            joint: String::from("fl_caster"),
            stuck: false,
        })
        .unwrap();
        arch.serialise(Row {
            time_s: 1.0,
            joint: String::from("fl_caster"),
            stuck: true,
        })
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "time_s,joint,stuck");
        assert_eq!(lines[2], "1.0,fl_caster,true");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_default_archiver_is_not_initialised() {
        let mut arch = Archiver::default();
        assert!(matches!(
            arch.serialise(0u8),
            Err(ArchiveError::NotInitialised)
        ));
    }
}
