use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use tracing::warn;

/// Filesystem watcher for the timeline config file.
///
/// The host polls `reload_requested` once per tick and reloads/swaps the
/// config when it reports true. Consumption is drain-based on the calling
/// thread; only notify's own watcher thread runs in the background.
pub struct ConfigWatcher {
    // Kept alive for the lifetime of the watch; dropping it stops notify.
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    path: PathBuf,
}

impl ConfigWatcher {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher
            .configure(
                NotifyConfig::default()
                    .with_compare_contents(false)
                    .with_poll_interval(Duration::from_millis(300)),
            )
            .context("configure config watcher")?;
        // Watch the parent directory: editors and mod managers usually
        // replace the file, which a file-level watch misses.
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .with_context(|| format!("watch {}", root.display()))?;
        Ok(Self { _watcher: watcher, rx, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain pending filesystem events; true when the config file changed
    /// since the last call.
    pub fn reload_requested(&mut self) -> bool {
        let mut requested = false;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(event) => {
                    if !Self::is_relevant(&event.kind) {
                        continue;
                    }
                    if event.paths.iter().any(|p| p.file_name() == self.path.file_name()) {
                        requested = true;
                    }
                }
                Err(err) => warn!(error = %err, "config watcher error"),
            }
        }
        requested
    }

    fn is_relevant(kind: &EventKind) -> bool {
        matches!(
            kind,
            EventKind::Modify(ModifyKind::Data(_))
                | EventKind::Modify(ModifyKind::Name(_))
                | EventKind::Modify(ModifyKind::Any)
                | EventKind::Create(_)
        )
    }
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher").field("path", &self.path).finish()
    }
}
