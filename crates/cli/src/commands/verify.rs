use anyhow::{Context, Result};
use site_assets_core::AssetLayout;
use site_assets_core::manifest::read_manifest;
use site_assets_core::verify::{AssetStatus, verify_manifest};

use super::resolve_settings;
use crate::PathArgs;

pub async fn run(paths: PathArgs) -> Result<()> {
    let settings = resolve_settings(&paths)?;
    println!("🔍 Verifying assets for: {}", settings.manifest.display());

    let manifest = read_manifest(&settings.manifest)
        .with_context(|| format!("Failed to read manifest {}", settings.manifest.display()))?;
    let report = verify_manifest(&manifest, &AssetLayout::new(&settings.public_dir))?;

    for check in &report.checks {
        match &check.status {
            AssetStatus::Ok { size, sha256 } => {
                println!("   ✓ {} ({} bytes, sha256 {})", check.field, size, &sha256[..12]);
            }
            AssetStatus::Remote => println!("   ✗ {}: still remote: {}", check.field, check.value),
            AssetStatus::OutsideAssetRoot => {
                println!("   ✗ {}: not under /assets: {}", check.field, check.value)
            }
            AssetStatus::Missing => println!("   ✗ {}: file missing: {}", check.field, check.value),
            AssetStatus::NotAFile => {
                println!("   ✗ {}: not a regular file: {}", check.field, check.value)
            }
            AssetStatus::Empty => println!("   ✗ {}: file is empty: {}", check.field, check.value),
        }
    }

    if !report.stale.is_empty() {
        println!();
        println!("   ⚠ {} file(s) not referenced by the manifest:", report.stale.len());
        for path in &report.stale {
            println!("     - {}", path.display());
        }
    }

    println!();
    if !report.is_ok() {
        let failed = report.failures().count();
        anyhow::bail!("{} of {} assets are not materialized", failed, report.checks.len());
    }

    println!(
        "✅ All {} assets present ({} bytes)",
        report.checks.len(),
        report.total_bytes()
    );
    Ok(())
}
