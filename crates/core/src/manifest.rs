use crate::error::{Error, Result};
use crate::layout::validate_manifest;
use crate::types::Manifest;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Read and validate a manifest file
pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
    parse_manifest_str(&content)
}

/// Parse a manifest from a string (useful for testing)
pub fn parse_manifest_str(content: &str) -> Result<Manifest> {
    let manifest: Manifest = serde_json::from_str(content)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Pretty-printed JSON with a trailing newline
pub fn render_manifest(manifest: &Manifest) -> Result<String> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    Ok(json)
}

/// Replace the manifest at `path` without ever exposing a truncated file.
pub fn write_manifest<P: AsRef<Path>>(path: P, manifest: &Manifest) -> Result<()> {
    let json = render_manifest(manifest)?;
    write_atomic(path.as_ref(), json.as_bytes())
}

/// Write `bytes` to a temp file next to `path`, fsync it, then rename over `path`.
///
/// The temp file lives in the destination directory so the rename stays on
/// one filesystem. It is removed if anything fails before the rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| Error::filesystem(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::filesystem(dir, e))?;
    set_published_mode(tmp.as_file(), Some(path)).map_err(|e| Error::filesystem(tmp.path(), e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::filesystem(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| Error::filesystem(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "atomically replaced file");
    Ok(())
}

/// Mode for files under the public directory when no existing file dictates one
pub const PUBLISHED_MODE: u32 = 0o644;

/// Give a temp file the mode it should have once renamed into place.
///
/// Temp files are created owner-only. `replacing` keeps the mode of the file
/// being replaced; without one the file gets [`PUBLISHED_MODE`] so the web
/// server can read it.
#[cfg(unix)]
pub fn set_published_mode(file: &fs::File, replacing: Option<&Path>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = replacing
        .and_then(|p| fs::metadata(p).ok())
        .filter(|meta| meta.is_file())
        .map(|meta| meta.permissions().mode() & 0o7777)
        .unwrap_or(PUBLISHED_MODE);
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_published_mode(_file: &fs::File, _replacing: Option<&Path>) -> std::io::Result<()> {
    Ok(())
}
