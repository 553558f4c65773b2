pub mod config;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod types;
pub mod verify;

pub use config::{DownloadSettings, RetryPolicy, Settings};
pub use error::{Error, Result};
pub use layout::{AssetLayout, AssetTarget, derive_extension};
pub use manifest::{read_manifest, set_published_mode, write_manifest};
pub use types::*;
