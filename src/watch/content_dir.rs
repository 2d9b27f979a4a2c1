use std::path::{Path, PathBuf};

use notify::{RecursiveMode, Watcher};

/// Attachment of the content directory to the notify watcher.
///
/// The directory may not exist yet when watching starts, and it can be
/// deleted and recreated while watching. Each [`sync`](Self::sync) brings the
/// watch in line with what is on disk.
pub(super) struct ContentDirWatch {
    dir: PathBuf,
    attached: bool,
}

impl ContentDirWatch {
    pub(super) fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            attached: false,
        }
    }

    pub(super) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Attach when the directory exists, detach when it is gone.
    pub(super) fn sync<W: Watcher>(&mut self, watcher: &mut W) -> notify::Result<bool> {
        let exists = self.dir.is_dir();

        if self.attached && !exists {
            // The backend usually drops the handle itself once the dir is gone.
            let _ = watcher.unwatch(&self.dir);
            self.attached = false;
            crate::debug!("watch"; "content dir gone: {}", self.dir.display());
        } else if !self.attached && exists {
            watcher.watch(&self.dir, RecursiveMode::Recursive)?;
            self.attached = true;
            crate::debug!("watch"; "attached: {}", self.dir.display());
        }

        Ok(self.attached)
    }
}
