//! Per-execution scratch directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A uniquely named directory owning one execution's source and build
/// artifacts. The directory and everything in it is removed when the guard
/// is dropped, on every exit path.
#[derive(Debug)]
pub struct ArtifactDir {
    path: PathBuf,
}

impl ArtifactDir {
    /// Create `exec-<uuid>` under `root`.
    pub fn create(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(format!("exec-{}", uuid::Uuid::new_v4()));
        fs::create_dir(&path)?;
        debug!(path = ?path, "Created artifact dir");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the source artifact verbatim and return its path.
    pub fn write_source(&self, file_name: &str, code: &str) -> io::Result<PathBuf> {
        let source = self.path.join(file_name);
        fs::write(&source, code)?;
        Ok(source)
    }

    /// Where a compile step should place its executable.
    pub fn binary_path(&self) -> PathBuf {
        self.path.join("main")
    }
}

impl Drop for ArtifactDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Removed artifact dir"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "Failed to remove artifact dir"),
        }
    }
}
