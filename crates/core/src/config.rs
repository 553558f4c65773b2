use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "site-assets.toml";
pub const DEFAULT_MANIFEST_PATH: &str = "public/generated/manifest.json";
pub const DEFAULT_PUBLIC_DIR: &str = "public";

pub const MAX_CONCURRENCY: usize = 32;

/// Raw TOML configuration structure
/// Every field is optional; missing values fall back to the defaults
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    download: RawDownload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPaths {
    manifest: Option<String>,
    public_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDownload {
    concurrency: Option<usize>,
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    user_agent: Option<String>,
    system_proxy: Option<bool>,
}

/// Resolved settings for one materialization run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub manifest: PathBuf,
    pub public_dir: PathBuf,
    pub download: DownloadSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    /// Simultaneous transfers
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Honor `HTTP(S)_PROXY` / `NO_PROXY` from the environment
    pub system_proxy: bool,
}

/// Exponential backoff for transient download failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Add up to 50% random extra delay
    pub jitter: bool,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped.
    /// Jitter is applied by the caller.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(120),
            user_agent: concat!("site-assets/", env!("CARGO_PKG_VERSION")).to_string(),
            system_proxy: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST_PATH),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            download: DownloadSettings::default(),
        }
    }
}

/// Load settings from a config file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
    parse_settings_str(&content)
}

/// Load `site-assets.toml` from `dir` if present, defaults otherwise
pub fn load_settings_or_default<P: AsRef<Path>>(dir: P) -> Result<Settings> {
    let path = dir.as_ref().join(DEFAULT_CONFIG_FILE);
    if path.exists() {
        load_settings(path)
    } else {
        Ok(Settings::default())
    }
}

/// Parse settings from a string (useful for testing)
pub fn parse_settings_str(content: &str) -> Result<Settings> {
    let raw: RawConfig = toml::from_str(content)?;
    let defaults = Settings::default();

    let manifest = match raw.paths.manifest {
        Some(p) => validate_path(&p, "paths.manifest")?,
        None => defaults.manifest,
    };
    let public_dir = match raw.paths.public_dir {
        Some(p) => validate_path(&p, "paths.public_dir")?,
        None => defaults.public_dir,
    };

    let mut download = defaults.download;
    if let Some(concurrency) = raw.download.concurrency {
        download.concurrency = validate_concurrency(concurrency)?;
    }
    if let Some(attempts) = raw.download.max_attempts {
        if attempts == 0 {
            return Err(Error::ConfigParse(
                "download.max_attempts must be at least 1".to_string(),
            ));
        }
        download.retry.max_attempts = attempts;
    }
    if let Some(ms) = raw.download.base_delay_ms {
        download.retry.base_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = raw.download.max_delay_ms {
        download.retry.max_delay = Duration::from_millis(ms);
    }
    if download.retry.max_delay < download.retry.base_delay {
        return Err(Error::ConfigParse(
            "download.max_delay_ms must not be smaller than download.base_delay_ms".to_string(),
        ));
    }
    if let Some(secs) = raw.download.request_timeout_secs {
        if secs == 0 {
            return Err(Error::ConfigParse(
                "download.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        download.request_timeout = Duration::from_secs(secs);
    }
    if let Some(agent) = raw.download.user_agent {
        if agent.trim().is_empty() {
            return Err(Error::ConfigParse("Empty download.user_agent".to_string()));
        }
        download.user_agent = agent;
    }
    if let Some(system_proxy) = raw.download.system_proxy {
        download.system_proxy = system_proxy;
    }

    Ok(Settings {
        manifest,
        public_dir,
        download,
    })
}

pub fn validate_concurrency(concurrency: usize) -> Result<usize> {
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(Error::ConfigParse(format!(
            "Concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, concurrency
        )));
    }
    Ok(concurrency)
}

/// Validate and convert a path string from the config file to PathBuf.
///
/// Config files are checked into the site repository, so paths must stay
/// inside the project: absolute paths and `..` components are rejected.
///
/// ```text
/// validate_path("public/generated/manifest.json", "paths.manifest")  → Ok(PathBuf)
/// validate_path("/etc/passwd", "paths.manifest")                     → Err("Absolute paths not allowed...")
/// validate_path("../other-site/public", "paths.public_dir")          → Err("Parent directory references...")
/// ```
fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    let path = Path::new(path_str);

    if path.is_absolute() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let settings = parse_settings_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.manifest,
            PathBuf::from("public/generated/manifest.json")
        );
        assert_eq!(settings.download.concurrency, 4);
        assert_eq!(settings.download.retry.max_attempts, 3);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[paths]
manifest = "site/generated/manifest.json"
public_dir = "site"

[download]
concurrency = 8
max_attempts = 5
base_delay_ms = 250
max_delay_ms = 4000
request_timeout_secs = 30
user_agent = "immofoto-assets"
system_proxy = false
        "#;

        let settings = parse_settings_str(toml).unwrap();
        assert_eq!(settings.public_dir, PathBuf::from("site"));
        assert_eq!(settings.download.concurrency, 8);
        assert_eq!(settings.download.retry.max_attempts, 5);
        assert_eq!(settings.download.retry.base_delay, Duration::from_millis(250));
        assert_eq!(settings.download.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.download.user_agent, "immofoto-assets");
        assert!(!settings.download.system_proxy);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            jitter: false,
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(5));
        assert_eq!(policy.backoff(40), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = parse_settings_str("[download]\nparallel = 3\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_rejects_bad_concurrency() {
        assert!(parse_settings_str("[download]\nconcurrency = 0\n").is_err());
        assert!(parse_settings_str("[download]\nconcurrency = 64\n").is_err());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = parse_settings_str("[download]\nmax_attempts = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_validate_path_rejects_absolute_unix() {
        let result = validate_path("/etc/passwd", "paths.manifest");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Absolute paths not allowed")
        );
    }

    #[test]
    fn test_validate_path_rejects_parent_dir() {
        let result = parse_settings_str("[paths]\npublic_dir = \"../other/public\"\n");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Parent directory references"));
        assert!(msg.contains("paths.public_dir"));
    }

    #[test]
    fn test_validate_path_rejects_empty() {
        let result = validate_path("   ", "paths.manifest");
        assert!(result.unwrap_err().to_string().contains("Empty path"));
    }
}
