//! Append-only permission log (one JSON record per line)

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::record::PermissionRecord;
use crate::core::{MonitorError, MonitorResult};

/// Shared writer for classified requests
///
/// Each record is written with a single `write_all` under the lock, so
/// concurrent callers never interleave lines.
pub struct PermissionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl PermissionLog {
    /// Open `path` for appending, creating it and its parent directory
    pub fn open(path: impl Into<PathBuf>) -> MonitorResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!("[PermissionLog] Appending to {:?}", path);

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &PermissionRecord) -> MonitorResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| MonitorError::invalid("permission log lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Load every record of a permission log; blank lines are skipped
pub fn read_records(path: impl AsRef<Path>) -> MonitorResult<Vec<PermissionRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            MonitorError::InvalidRecord(format!("{}:{}: {}", path.display(), number + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}
