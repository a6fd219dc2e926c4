//! # Flat-File Item Store
//!
//! Line-oriented `name = value` persistence used by the offline driver
//! service as a stand-in for a live backend. One read-modify-write pass per
//! request, whole file rewritten on change.
//!
//! There is no locking beyond the single file handle: concurrent requests
//! may race and the last writer wins. Documented limitation, not fixed here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlatFileError {
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),
}

pub struct FlatFileStore {
    path: PathBuf,
}

impl FlatFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serves one driver request: read all items from the file, overwrite
    /// the named entries when a value is given, write the file back, and
    /// return the requested names mapped to their current values (absent
    /// names map to an empty string).
    pub fn request(
        &self,
        items: &[&str],
        val: Option<&str>,
    ) -> Result<BTreeMap<String, String>, FlatFileError> {
        let mut data = self.read_all()?;

        if let Some(val) = val {
            for item in items {
                data.insert((*item).to_string(), val.to_string());
            }
            self.write_all(&data)?;
        }

        let mut result = BTreeMap::new();
        for item in items {
            result.insert(
                (*item).to_string(),
                data.get(*item).cloned().unwrap_or_default(),
            );
        }
        Ok(result)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, FlatFileError> {
        if !self.path.is_file() {
            fs::File::create(&self.path)?;
        }

        let text = fs::read_to_string(&self.path)?;
        let mut data = BTreeMap::new();
        for line in text.lines() {
            if let Some((item, val)) = line.split_once('=') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                data.insert(item.to_string(), val.trim().to_string());
            }
        }
        Ok(data)
    }

    fn write_all(&self, data: &BTreeMap<String, String>) -> Result<(), FlatFileError> {
        let mut text = String::new();
        for (item, val) in data {
            text.push_str(item);
            text.push_str(" = ");
            text.push_str(val);
            text.push_str("\r\n");
        }
        fs::write(&self.path, text)?;
        Ok(())
    }
}
