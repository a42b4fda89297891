// src/watcher.rs
//! Log list file watcher using notify

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::ct_log::LogStore;

/// Expires the store's staleness gate whenever the log list file changes.
///
/// The parent directory is watched rather than the file itself, since log
/// lists are usually replaced by rename. Watching stops when this is dropped.
pub struct LogListWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl LogListWatcher {
    /// Start watching `path` on behalf of `store`
    pub fn spawn(store: LogStore, path: PathBuf) -> anyhow::Result<Self> {
        let dir = watch_dir(&path);
        let file_name = path.file_name().map(OsStr::to_os_string);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if Self::should_expire(&event, file_name.as_deref()) {
                        tracing::debug!("Log list change detected: {:?}", event.kind);
                        store.expire_check();
                    }
                }
                Err(e) => {
                    tracing::warn!("Log list watcher error: {}", e);
                }
            }
        })
        .context("Failed to create log list watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", dir))?;

        tracing::info!("Watching log list: {:?}", path);

        Ok(Self {
            path,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if event should expire the staleness gate
    fn should_expire(event: &Event, file_name: Option<&OsStr>) -> bool {
        let relevant_kind = matches!(
            event.kind,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
        );

        relevant_kind
            && match file_name {
                Some(name) => event.paths.iter().any(|p| p.file_name() == Some(name)),
                None => true,
            }
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ct_log::FileLogListSource;
    use notify::event::{CreateKind, ModifyKind};
    use tempfile::TempDir;

    #[test]
    fn test_should_expire_on_matching_file() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/data/ct/v1/current/log_list.json"));
        assert!(LogListWatcher::should_expire(&event, Some(OsStr::new("log_list.json"))));
    }

    #[test]
    fn test_should_not_expire_on_other_file() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/data/ct/v1/current/other.json"));
        assert!(!LogListWatcher::should_expire(&event, Some(OsStr::new("log_list.json"))));
    }

    #[test]
    fn test_should_not_expire_on_access() {
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/data/log_list.json"));
        assert!(!LogListWatcher::should_expire(&event, Some(OsStr::new("log_list.json"))));
    }

    #[test]
    fn test_watch_dir() {
        assert_eq!(watch_dir(Path::new("/a/b/log_list.json")), PathBuf::from("/a/b"));
        assert_eq!(watch_dir(Path::new("log_list.json")), PathBuf::from("."));
    }

    #[test]
    fn test_watcher_creation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log_list.json");
        let store = LogStore::builder(FileLogListSource::new(path.clone())).build();

        let watcher = LogListWatcher::spawn(store, path.clone()).unwrap();
        assert_eq!(watcher.path(), path.as_path());
    }

    // Note: delivery of file system events is timing dependent, so the
    // expire path is covered through `should_expire` and the store tests.
}
