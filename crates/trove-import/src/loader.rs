//! Dataset file loader
//!
//! Reads a directory of JSON changeset files, sorted by file name so
//! that timestamp-named files replay in order. A file that fails to
//! parse is logged and skipped; the batch continues.

use crate::error::{Error, Result};
use crate::records::ChangesetRecord;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Loader for historical dataset files
#[derive(Debug, Default)]
pub struct Loader {
    records: Vec<ChangesetRecord>,
    skipped: usize,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single JSON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
            .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))
    }

    /// Load a record from a JSON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let record: ChangesetRecord =
            serde_json::from_str(content).map_err(|e| Error::Parse(e.to_string()))?;
        self.records.push(record);
        Ok(())
    }

    /// Load every `.json` file in a directory, sorted by file name.
    ///
    /// Unparseable files are skipped with a warning.
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut files: Vec<_> = fs::read_dir(path)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        files.sort();

        for file in files {
            if let Err(e) = self.load_file(&file) {
                warn!("skipping dataset file: {e}");
                self.skipped += 1;
            }
        }
        Ok(())
    }

    /// Number of files skipped as unparseable
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Finish loading and return the records
    pub fn finish(self) -> Vec<ChangesetRecord> {
        self.records
    }
}
