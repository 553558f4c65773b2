pub mod materialize;
pub mod verify;

use crate::PathArgs;
use anyhow::{Context, Result};
use site_assets_core::Settings;
use site_assets_core::config::{load_settings, load_settings_or_default};

/// Config file (explicit or `./site-assets.toml`), then CLI overrides
pub fn resolve_settings(paths: &PathArgs) -> Result<Settings> {
    let mut settings = match &paths.config {
        Some(path) => load_settings(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => load_settings_or_default(".").context("Failed to load site-assets.toml")?,
    };

    if let Some(manifest) = &paths.manifest {
        settings.manifest = manifest.clone();
    }
    if let Some(public_dir) = &paths.public_dir {
        settings.public_dir = public_dir.clone();
    }
    Ok(settings)
}
