use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::adapters::persistence::{PersistenceError, lock_writer};
use crate::domain::models::{AvailabilityLogEntry, timestamp_to_iso8601};

pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "available",
    "available_count",
    "total_count",
    "update_time",
    "error",
];

/// Append-only CSV history of probe outcomes. Writers are serialized so rows
/// from the scheduled and on-demand paths never interleave.
#[derive(Debug)]
pub struct AvailabilityLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AvailabilityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the header when the file does not exist yet. Returns whether a
    /// new file was created.
    pub fn initialize(&self) -> Result<bool, PersistenceError> {
        let _guard = lock_writer(&self.write_lock, "availability log")?;
        if self.path.exists() {
            return Ok(false);
        }
        self.write_line(&csv_row(CSV_HEADER))?;
        Ok(true)
    }

    pub fn append(&self, entry: &AvailabilityLogEntry) -> Result<(), PersistenceError> {
        let _guard = lock_writer(&self.write_lock, "availability log")?;
        if !self.path.exists() {
            self.write_line(&csv_row(CSV_HEADER))?;
        }
        self.write_line(&format_entry(entry))
    }

    fn write_line(&self, line: &str) -> Result<(), PersistenceError> {
        let io_error = |source| PersistenceError::Io {
            path: self.path.to_string_lossy().into_owned(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        file.write_all(format!("{line}\r\n").as_bytes())
            .map_err(io_error)
    }
}

pub fn format_entry(entry: &AvailabilityLogEntry) -> String {
    let timestamp = timestamp_to_iso8601(entry.timestamp);
    let available_count = entry.available_count.to_string();
    let total_count = entry.total_count.to_string();

    csv_row([
        timestamp.as_str(),
        if entry.available { "True" } else { "False" },
        available_count.as_str(),
        total_count.as_str(),
        entry.update_time.as_deref().unwrap_or_default(),
        entry.error.as_deref().unwrap_or_default(),
    ])
}

fn csv_row<const N: usize>(fields: [&str; N]) -> String {
    fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
