//! Persisted port record storage.
//!
//! The record is a single `host:port` line, written by a server that picked a
//! fresh port and read back by clients (and reusing servers) to find it.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ControlError, Result};

/// File name of the port record under `<home>/conf`.
pub const PORT_FILE_NAME: &str = "controlport";

/// Read/write access to the persisted port record.
pub trait PortStore: Send + Sync {
    /// The stored listen specification, if one exists and is readable.
    fn read(&self) -> Option<String>;

    /// Replace the stored record with `host:port`.
    fn write(&self, host: &str, port: u16) -> Result<()>;

    /// Where the record lives, for log messages.
    fn describe(&self) -> String;
}

/// Port record kept in `<home>/conf/controlport`.
#[derive(Debug, Clone)]
pub struct FilePortStore {
    path: PathBuf,
}

impl FilePortStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located under an application home directory.
    pub fn in_home(home: impl AsRef<Path>) -> Self {
        Self::new(home.as_ref().join("conf").join(PORT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PortStore for FilePortStore {
    fn read(&self) -> Option<String> {
        // Unreadable or missing records are treated as absent.
        let content = fs::read_to_string(&self.path).ok()?;
        content.lines().next().map(str::to_string)
    }

    fn write(&self, host: &str, port: u16) -> Result<()> {
        let store_err = |source| ControlError::Store {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(store_err)?;
        }
        fs::write(&self.path, format!("{}:{}\n", host, port)).map_err(store_err)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process port record, for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryPortStore {
    record: Mutex<Option<String>>,
}

impl MemoryPortStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a record.
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(record.into())),
        }
    }
}

impl PortStore for MemoryPortStore {
    fn read(&self) -> Option<String> {
        self.record.lock().ok().and_then(|record| record.clone())
    }

    fn write(&self, host: &str, port: u16) -> Result<()> {
        if let Ok(mut record) = self.record.lock() {
            *record = Some(format!("{}:{}", host, port));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory port record".to_string()
    }
}
