use anyhow::{Context, Result};
use site_assets_core::config::validate_concurrency;
use site_assets_core::manifest::read_manifest;
use site_assets_core::{AssetLayout, ManifestState};
use site_assets_fetch::{CancellationToken, Materializer, RunOutcome, plan};
use std::time::Duration;
use tracing::warn;

use super::resolve_settings;
use crate::PathArgs;

/// Download all remote assets and rewrite the manifest
pub async fn run(
    paths: PathArgs,
    concurrency: Option<usize>,
    timeout: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    let mut settings = resolve_settings(&paths)?;
    if let Some(n) = concurrency {
        settings.download.concurrency = validate_concurrency(n)?;
    }

    println!("📥 Materializing site assets...");
    println!("   Manifest: {}", settings.manifest.display());
    println!("   Assets:   {}", settings.public_dir.join("assets").display());
    println!();

    if dry_run {
        return print_plan(&settings.manifest, &AssetLayout::new(&settings.public_dir));
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());
    if let Some(secs) = timeout {
        spawn_deadline(cancel.clone(), Duration::from_secs(secs));
    }

    let materializer = Materializer::new(&settings, cancel)?;
    let report = materializer
        .run(&settings.manifest)
        .await
        .context("Asset materialization aborted; manifest left unchanged")?;

    match report.outcome {
        RunOutcome::AlreadyLocal => {
            println!("✓ Manifest already points at local files - nothing to do");
        }
        RunOutcome::Materialized => {
            println!("✅ All assets downloaded successfully!");
            println!(
                "   {} assets, {} bytes in {:.1}s",
                report.assets,
                report.bytes,
                report.elapsed.as_secs_f64()
            );
            println!(
                "📋 Manifest updated with local paths: {}",
                report.manifest_path.display()
            );
        }
    }

    Ok(())
}

/// Show what would be downloaded where, without network access
fn print_plan(manifest_path: &std::path::Path, layout: &AssetLayout) -> Result<()> {
    let manifest = read_manifest(manifest_path)
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;

    match manifest.state() {
        ManifestState::Local => {
            println!("✓ Manifest already points at local files - nothing to do");
            return Ok(());
        }
        ManifestState::Mixed { remote, local } => {
            anyhow::bail!(
                "Manifest mixes {} remote and {} local entries; restore the remote manifest first",
                remote,
                local
            );
        }
        ManifestState::Remote => {}
    }

    let jobs = plan(&manifest, layout).context("Failed to plan downloads")?;
    println!("📋 Download Plan ({} assets):", jobs.len());
    for job in &jobs {
        println!("   {}", job.field);
        println!("      From: {}", job.url);
        println!("      To:   {}", job.target.file.display());
        println!("      Path: {}", job.target.web_path);
    }
    Ok(())
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling downloads");
            cancel.cancel();
        }
    });
}

fn spawn_deadline(cancel: CancellationToken, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        warn!(timeout_secs = after.as_secs(), "timeout reached, cancelling downloads");
        cancel.cancel();
    });
}
