//! Scratch storage for normalized rasters.
//!
//! Files handed out by a [`ScratchStorage`] persist until `release_all` is
//! called. Nothing is removed on drop: the owner of the storage carries the
//! cleanup obligation.

use std::io;
use std::path::PathBuf;

/// Temp-storage manager consumed by the normalizer.
pub trait ScratchStorage {
    /// Allocate a fresh, empty scratch file ending in `suffix` and return its path.
    fn allocate(&mut self, suffix: &str) -> io::Result<PathBuf>;

    /// Remove every file allocated so far. Calling it again is a no-op.
    fn release_all(&mut self);
}

/// Scratch files created under a directory (the system temp dir by default).
#[derive(Debug)]
pub struct ScratchDir {
    dir: PathBuf,
    allocated: Vec<PathBuf>,
}

impl ScratchDir {
    /// Scratch storage rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            allocated: Vec::new(),
        }
    }

    /// Paths allocated and not yet released.
    pub fn allocated(&self) -> &[PathBuf] {
        &self.allocated
    }
}

impl Default for ScratchDir {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ScratchStorage for ScratchDir {
    fn allocate(&mut self, suffix: &str) -> io::Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("facefind-")
            .suffix(suffix)
            .tempfile_in(&self.dir)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;

        tracing::debug!(path = %path.display(), "allocated scratch file");
        self.allocated.push(path.clone());
        Ok(path)
    }

    fn release_all(&mut self) {
        for path in self.allocated.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "released scratch file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to release scratch file")
                }
            }
        }
    }
}
