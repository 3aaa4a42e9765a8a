//! Crash-consistent file replacement.
//!
//! New content is written to a temporary file in the target's own directory
//! (same volume), flushed to disk, and renamed over the target. A reader sees
//! either the previous complete content or the new complete content.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::TempPath;

/// Function used to move the finished temporary file over the target.
pub type RenameFn = fn(&Path, &Path) -> io::Result<()>;

/// Writes whole-file replacements atomically.
#[derive(Debug, Clone, Copy)]
pub struct AtomicWriter {
    rename: RenameFn,
}

impl Default for AtomicWriter {
    fn default() -> Self {
        Self {
            rename: |from, to| fs::rename(from, to),
        }
    }
}

impl AtomicWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `rename` as the replace primitive instead of `std::fs::rename`.
    ///
    /// Lets tests make the final step fail after the temporary file is
    /// complete.
    pub fn with_rename(rename: RenameFn) -> Self {
        Self { rename }
    }

    /// Replace the contents of `path` with `content`.
    ///
    /// On failure before the replace completes, the temporary file is removed
    /// and `path` is left untouched. If the rename reports
    /// [`io::ErrorKind::Unsupported`] the content is copied over the target
    /// instead, which leaves a narrow window for a torn file on crash.
    pub fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
        })?;
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name.to_string_lossy()))
            .suffix(".tmp")
            .tempfile_in(parent)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        let tmp_path = tmp.into_temp_path();

        match (self.rename)(&tmp_path, path) {
            Ok(()) => {
                disarm(tmp_path);
                sync_dir(parent);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                tracing::warn!(
                    path = %path.display(),
                    "atomic rename unsupported, falling back to plain replace"
                );
                fs::copy(&tmp_path, path)?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// The temp file now lives at the target; stop it from being deleted.
fn disarm(tmp_path: TempPath) {
    let _ = tmp_path.keep();
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Replace `path` with `content` using the default writer.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    AtomicWriter::default().write(path, content)
}
