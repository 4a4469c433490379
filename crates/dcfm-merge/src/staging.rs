use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

const STAGING_PREFIX: &str = "dcfm-";

/// A request-scoped scratch directory for uploaded and generated workbooks.
///
/// Every staged file gets a fresh `<role>-<uuid>.xlsx` name, so concurrent
/// requests never share a path. Dropping the area removes the directory and
/// everything in it, whichever way the request ends.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Create a staging directory under `root`, creating `root` if needed.
    pub fn new_in(root: impl AsRef<Path>) -> io::Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)?;
        debug!(path = %dir.path().display(), "created staging area");
        Ok(Self { dir })
    }

    /// Create a staging directory under the OS temp dir.
    pub fn new() -> io::Result<Self> {
        Self::new_in(std::env::temp_dir())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A fresh path for a file of the given role; nothing is written yet.
    pub fn allocate(&self, role: &str) -> PathBuf {
        self.dir.path().join(format!("{role}-{}.xlsx", Uuid::now_v7()))
    }

    /// Write `bytes` to a fresh path for `role` and return that path.
    pub fn stage(&self, role: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.allocate(role);
        std::fs::write(&path, bytes)?;
        debug!(role, bytes = bytes.len(), path = %path.display(), "staged upload");
        Ok(path)
    }

    /// Remove the directory now, reporting any failure (dropping does the
    /// same silently).
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}
