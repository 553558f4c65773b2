use crate::retry::with_retry;
use crate::staged::{FetchedFile, StagedFile};
use futures::StreamExt;
use site_assets_core::{DownloadSettings, Error, Result, RetryPolicy};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP client for pulling remote assets onto local disk
#[derive(Debug, Clone)]
pub struct AssetClient {
    http: reqwest::Client,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl AssetClient {
    /// Create a new client; cancelling `cancel` aborts every in-flight fetch
    pub fn new(settings: &DownloadSettings, cancel: CancellationToken) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout);
        if !settings.system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| Error::HttpClient(error_chain(&e)))?;

        Ok(Self {
            http,
            retry: settings.retry.clone(),
            cancel,
        })
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Download `url` to `dest`, retrying transient failures, and rename it into place.
    pub async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<FetchedFile> {
        self.fetch_staged(url, dest).await?.commit()
    }

    /// Download `url` into a temp file beside `dest` without touching `dest`.
    ///
    /// Retries per the configured policy. The caller decides when to commit.
    pub async fn fetch_staged(&self, url: &str, dest: &Path) -> Result<StagedFile> {
        with_retry(&self.retry, url, &self.cancel, move |attempt| {
            debug!(url, attempt, dest = %dest.display(), "fetching asset");
            self.fetch_once(url, dest)
        })
        .await
    }

    /// One GET, streamed into a fresh staged file
    async fn fetch_once(&self, url: &str, dest: &Path) -> Result<StagedFile> {
        let network = |e: reqwest::Error| Error::NetworkFailure {
            url: url.to_string(),
            cause: error_chain(&e),
        };

        let response = self.http.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadFailure {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // An announced empty body will not change on retry
        if status == reqwest::StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(Error::EmptyResponse {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut staged = StagedFile::create(dest)?;
        let mut file = staged.writer()?;
        let write_err = |e: std::io::Error| Error::filesystem(dest, e);

        let mut bytes: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(network)?;
            file.write_all(&chunk).await.map_err(write_err)?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;

        if bytes == 0 {
            return Err(Error::NetworkFailure {
                url: url.to_string(),
                cause: "empty response body".to_string(),
            });
        }

        staged.set_len(bytes);
        Ok(staged)
    }
}

/// reqwest hides the interesting part (DNS, connect, timeout) in the source chain
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
