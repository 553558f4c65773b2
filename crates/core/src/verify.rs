//! Post-run check that a manifest is fully materialized on disk.

use crate::error::{Error, Result};
use crate::layout::AssetLayout;
use crate::types::{Manifest, is_remote};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    /// Local file present and non-empty
    Ok { size: u64, sha256: String },
    /// Field still holds a remote URL
    Remote,
    /// Field is not a web path under the asset root
    OutsideAssetRoot,
    Missing,
    /// Path exists but is a directory or other non-regular file
    NotAFile,
    Empty,
}

#[derive(Debug, Clone)]
pub struct AssetCheck {
    pub field: String,
    pub value: String,
    pub file: Option<PathBuf>,
    pub status: AssetStatus,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub checks: Vec<AssetCheck>,
    /// Files under the asset root that no manifest field points to
    pub stale: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.checks
            .iter()
            .all(|c| matches!(c.status, AssetStatus::Ok { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &AssetCheck> {
        self.checks
            .iter()
            .filter(|c| !matches!(c.status, AssetStatus::Ok { .. }))
    }

    pub fn total_bytes(&self) -> u64 {
        self.checks
            .iter()
            .map(|c| match c.status {
                AssetStatus::Ok { size, .. } => size,
                _ => 0,
            })
            .sum()
    }
}

/// Check every asset field of `manifest` against the files under `layout`
pub fn verify_manifest(manifest: &Manifest, layout: &AssetLayout) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let mut referenced = HashSet::new();

    for asset in manifest.asset_refs() {
        let Some(value) = manifest.field(&asset) else {
            continue;
        };
        let field = asset.describe(manifest);

        if is_remote(value) {
            report.checks.push(AssetCheck {
                field,
                value: value.to_string(),
                file: None,
                status: AssetStatus::Remote,
            });
            continue;
        }

        let Some(file) = layout.resolve_web_path(value) else {
            report.checks.push(AssetCheck {
                field,
                value: value.to_string(),
                file: None,
                status: AssetStatus::OutsideAssetRoot,
            });
            continue;
        };

        let status = match file.metadata() {
            Ok(meta) if !meta.is_file() => AssetStatus::NotAFile,
            Ok(meta) if meta.len() == 0 => AssetStatus::Empty,
            Ok(meta) => AssetStatus::Ok {
                size: meta.len(),
                sha256: sha256_file(&file)?,
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => AssetStatus::Missing,
            Err(e) => return Err(Error::filesystem(&file, e)),
        };

        referenced.insert(file.clone());
        report.checks.push(AssetCheck {
            field,
            value: value.to_string(),
            file: Some(file),
            status,
        });
    }

    let root = layout.asset_root();
    if root.is_dir() {
        for entry in WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if !referenced.contains(entry.path()) {
                report.stale.push(entry.path().to_path_buf());
            }
        }
        report.stale.sort();
    }

    Ok(report)
}

/// Hex SHA-256 of a file's contents
pub fn sha256_file(path: &std::path::Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::filesystem(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| Error::filesystem(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}
