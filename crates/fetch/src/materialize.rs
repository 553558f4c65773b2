use crate::client::AssetClient;
use crate::staged::StagedFile;
use chrono::{SecondsFormat, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use site_assets_core::manifest::{read_manifest, write_manifest};
use site_assets_core::{
    AssetLayout, AssetRef, AssetTarget, Error, Manifest, ManifestState, Result, Settings,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Stage of a run, in the order a successful run passes through them.
///
/// All hero downloads finish before the first portfolio download starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Heroes,
    Portfolio,
    WritingManifest,
}

/// One asset to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetJob {
    pub asset: AssetRef,
    /// Field path in the manifest, for messages
    pub field: String,
    pub url: String,
    pub target: AssetTarget,
}

impl AssetJob {
    pub fn phase(&self) -> Phase {
        match self.asset {
            AssetRef::Portfolio(_) => Phase::Portfolio,
            _ => Phase::Heroes,
        }
    }
}

/// Resolve every asset field to a download job, heroes first, then portfolio
/// in manifest order. Fails before any network access if a destination
/// cannot be derived.
pub fn plan(manifest: &Manifest, layout: &AssetLayout) -> Result<Vec<AssetJob>> {
    manifest
        .asset_refs()
        .into_iter()
        .map(|asset| {
            let url = manifest
                .field(&asset)
                .ok_or_else(|| Error::InvalidManifest(asset.describe(manifest)))?
                .to_string();
            let target = layout.target(manifest, &asset)?;
            Ok(AssetJob {
                field: asset.describe(manifest),
                asset,
                url,
                target,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Materialized,
    /// Manifest already pointed at local files; nothing was written
    AlreadyLocal,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub assets: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Downloads every asset of a manifest and rewrites it to local paths
pub struct Materializer {
    client: AssetClient,
    layout: AssetLayout,
    concurrency: usize,
}

impl Materializer {
    pub fn new(settings: &Settings, cancel: CancellationToken) -> Result<Self> {
        Ok(Self {
            client: AssetClient::new(&settings.download, cancel)?,
            layout: AssetLayout::new(&settings.public_dir),
            concurrency: settings.download.concurrency.max(1),
        })
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    pub fn client(&self) -> &AssetClient {
        &self.client
    }

    /// Download every asset and return the manifest rewritten to web paths.
    ///
    /// Nothing under the asset directory changes unless every download
    /// succeeds. A fully local manifest is returned unchanged.
    pub async fn materialize_all(&self, manifest: &Manifest) -> Result<Manifest> {
        self.materialize_counted(manifest)
            .await
            .map(|(manifest, _)| manifest)
    }

    async fn materialize_counted(&self, manifest: &Manifest) -> Result<(Manifest, u64)> {
        match manifest.state() {
            ManifestState::Remote => {}
            ManifestState::Local => return Ok((manifest.clone(), 0)),
            ManifestState::Mixed { remote, local } => {
                return Err(Error::PartiallyMaterialized { remote, local });
            }
        }

        let jobs = plan(manifest, &self.layout)?;
        let staged = self.download_all(&jobs).await?;
        let bytes: u64 = staged.iter().map(StagedFile::bytes).sum();

        // All downloads succeeded: move them into place
        for file in staged {
            file.commit()?;
        }

        let mut updated = manifest.clone();
        for job in &jobs {
            updated.set_field(&job.asset, job.target.web_path.clone());
        }
        updated.downloaded_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

        Ok((updated, bytes))
    }

    /// Fetch all jobs phase by phase, heroes before portfolio, each phase
    /// with bounded parallelism. Results come back in job order.
    ///
    /// The first failure drops every other in-flight download, which removes
    /// their temp files, along with everything staged by earlier phases.
    async fn download_all(&self, jobs: &[AssetJob]) -> Result<Vec<StagedFile>> {
        let total = jobs.len();
        let mut staged = Vec::with_capacity(total);

        for phase in [Phase::Heroes, Phase::Portfolio] {
            let batch: Vec<(usize, &AssetJob)> = jobs
                .iter()
                .enumerate()
                .filter(|(_, job)| job.phase() == phase)
                .collect();
            info!(
                ?phase,
                assets = batch.len(),
                concurrency = self.concurrency,
                "downloading"
            );

            match self.download_batch(batch, total).await {
                Ok(done) => staged.extend(done),
                Err(e) => {
                    warn!(?phase, "run aborted, manifest left unchanged: {}", e);
                    return Err(e);
                }
            }
        }

        Ok(staged)
    }

    async fn download_batch(
        &self,
        batch: Vec<(usize, &AssetJob)>,
        total: usize,
    ) -> Result<Vec<StagedFile>> {
        let cancel = self.client.cancellation().clone();
        let downloads = stream::iter(batch)
            .map(|(index, job)| async move {
                let staged = self
                    .client
                    .fetch_staged(&job.url, &job.target.file)
                    .await
                    .inspect_err(|e| {
                        tracing::error!(field = %job.field, url = %job.url, "asset failed: {}", e)
                    })?;
                info!(
                    field = %job.field,
                    path = %job.target.file.display(),
                    bytes = staged.bytes(),
                    "[{}/{}] downloaded",
                    index + 1,
                    total
                );
                Ok::<_, Error>((index, staged))
            })
            .buffer_unordered(self.concurrency)
            .try_collect::<Vec<_>>();

        let mut done = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            done = downloads => done?,
        };

        done.sort_by_key(|(index, _)| *index);
        Ok(done.into_iter().map(|(_, staged)| staged).collect())
    }

    /// Full run: read the manifest, materialize, and atomically rewrite it.
    pub async fn run(&self, manifest_path: &Path) -> Result<RunReport> {
        let started = Instant::now();
        let manifest = read_manifest(manifest_path)?;
        let assets = manifest.asset_refs().len();

        if manifest.state() == ManifestState::Local {
            info!(path = %manifest_path.display(), "manifest already materialized");
            return Ok(RunReport {
                outcome: RunOutcome::AlreadyLocal,
                manifest_path: manifest_path.to_path_buf(),
                manifest,
                assets,
                bytes: 0,
                elapsed: started.elapsed(),
            });
        }

        let (updated, bytes) = self.materialize_counted(&manifest).await?;

        info!(phase = ?Phase::WritingManifest, path = %manifest_path.display(), "writing manifest");
        write_manifest(manifest_path, &updated)?;
        info!(
            assets,
            bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "materialization done"
        );

        Ok(RunReport {
            outcome: RunOutcome::Materialized,
            manifest_path: manifest_path.to_path_buf(),
            manifest: updated,
            assets,
            bytes,
            elapsed: started.elapsed(),
        })
    }
}
