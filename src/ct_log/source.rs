// src/ct_log/source.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Where the raw log list bytes come from
pub trait LogListSource: Send + Sync {
    /// Last-modified time of the current content
    fn last_modified(&self) -> io::Result<SystemTime>;

    /// Full content of the log list
    fn read(&self) -> io::Result<Vec<u8>>;
}

impl<T: LogListSource + ?Sized> LogListSource for Arc<T> {
    fn last_modified(&self) -> io::Result<SystemTime> {
        (**self).last_modified()
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        (**self).read()
    }
}

/// Log list stored as a single file on disk
#[derive(Debug, Clone)]
pub struct FileLogListSource {
    path: PathBuf,
}

impl FileLogListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogListSource for FileLogListSource {
    fn last_modified(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.path)?.modified()
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}
