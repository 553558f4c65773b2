use site_assets_core::{Error, Result, set_published_mode};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A fully downloaded asset sitting in a temp file next to its destination.
///
/// Dropping a `StagedFile` without committing removes the temp file, so an
/// aborted or cancelled run leaves nothing behind.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    dest: PathBuf,
    bytes: u64,
}

/// Result of a completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

impl StagedFile {
    /// Create the temp file in the destination's directory, creating
    /// missing parent directories first.
    pub(crate) fn create(dest: &Path) -> Result<Self> {
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| Error::filesystem(dir, e))?;

        let tmp = tempfile::Builder::new()
            .prefix(".site-assets-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| Error::filesystem(dir, e))?;
        set_published_mode(tmp.as_file(), None).map_err(|e| Error::filesystem(tmp.path(), e))?;

        Ok(Self {
            tmp,
            dest: dest.to_path_buf(),
            bytes: 0,
        })
    }

    /// Second handle onto the temp file for async writes
    pub(crate) fn writer(&self) -> Result<tokio::fs::File> {
        let file = self
            .tmp
            .as_file()
            .try_clone()
            .map_err(|e| Error::filesystem(self.tmp.path(), e))?;
        Ok(tokio::fs::File::from_std(file))
    }

    pub(crate) fn set_len(&mut self, bytes: u64) {
        self.bytes = bytes;
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Atomically rename into place, replacing any existing file
    pub fn commit(self) -> Result<FetchedFile> {
        let dest = self.dest;
        self.tmp
            .persist(&dest)
            .map_err(|e| Error::filesystem(&dest, e.error))?;
        tracing::debug!(path = %dest.display(), bytes = self.bytes, "committed asset");
        Ok(FetchedFile {
            path: dest,
            bytes: self.bytes,
        })
    }
}
