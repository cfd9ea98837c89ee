use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::Result;
use crate::model::{ChangeLogEntry, ChangeRecord};
use crate::observers::{Sink, SinkError};

/// Appends one JSON-encoded [`ChangeRecord`] per line to a file
#[derive(Debug)]
pub struct JsonlFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlFileSink {
    /// Open `path` for appending, creating it and its parent directories
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory or file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for JsonlFileSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn accept(&self, entry: &ChangeLogEntry) -> std::result::Result<(), SinkError> {
        let mut line = serde_json::to_string(&ChangeRecord::from(entry))?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| SinkError::new("jsonl file handle poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
