// Asset retrieval: HTTP client, retry/backoff, staged writes, and the
// materialization run that rewrites the manifest to local paths.

pub mod client;
pub mod materialize;
pub mod retry;
pub mod staged;

pub use client::AssetClient;
pub use materialize::{AssetJob, Materializer, Phase, RunOutcome, RunReport, plan};
pub use staged::{FetchedFile, StagedFile};
pub use tokio_util::sync::CancellationToken;
