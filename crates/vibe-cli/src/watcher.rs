//! File watcher for detecting source changes.
//!
//! Watches one component or generation file and reports changes to it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_mini::{DebounceEventResult, new_debouncer, notify::RecursiveMode};
use tokio::sync::mpsc;

/// File change event.
#[derive(Debug, Clone)]
pub enum FileEvent {
    /// File was modified or recreated.
    Modified(PathBuf),
    /// File was removed.
    Removed(PathBuf),
}

/// File watcher handle.
pub struct FileWatcher {
    /// Debouncer handle (kept alive to maintain watcher).
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// Receiver for file events.
    rx: mpsc::UnboundedReceiver<FileEvent>,
}

impl FileWatcher {
    /// Watch `path`, which must be a file.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let target = path.as_ref().to_path_buf();
        let watch_path = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            move |result: DebounceEventResult| {
                let Ok(events) = result else { return };
                for event in events {
                    if event.path != target {
                        continue;
                    }

                    let file_event = if event.path.exists() {
                        FileEvent::Modified(event.path)
                    } else {
                        FileEvent::Removed(event.path)
                    };

                    let _ = tx.send(file_event);
                }
            },
        )
        .map_err(|e| anyhow::anyhow!("Failed to create file watcher: {}", e))?;

        debouncer
            .watcher()
            .watch(&watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| anyhow::anyhow!("Failed to watch {}: {}", watch_path.display(), e))?;

        Ok(Self {
            _debouncer: debouncer,
            rx,
        })
    }

    /// Receive the next file event.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.rx.recv().await
    }
}
