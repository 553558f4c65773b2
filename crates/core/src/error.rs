use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// Remote returned a non-success status (after retries, if transient)
    DownloadFailure { url: String, status: u16 },
    /// Remote answered 2xx but announced an empty body (204, `Content-Length: 0`)
    EmptyResponse { url: String, status: u16 },
    /// Connection-level fault: DNS, connect, timeout, reset, body read
    NetworkFailure { url: String, cause: String },
    /// Asset URL has no derivable file extension or does not parse
    MalformedAssetUrl { url: String },
    FilesystemFailure { path: PathBuf, cause: std::io::Error },
    InvalidManifest(String),
    ConfigParse(String),
    /// The HTTP client could not be constructed
    HttpClient(String),
    /// Manifest mixes remote URLs and local paths
    PartiallyMaterialized { remote: usize, local: usize },
    Cancelled,
}

impl Error {
    pub fn filesystem(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        Error::FilesystemFailure {
            path: path.into(),
            cause,
        }
    }

    /// Whether a retry of the same request may succeed.
    ///
    /// Connection faults and 5xx responses are transient. Everything else
    /// (4xx, malformed URLs, local filesystem errors) fails the same way twice.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::NetworkFailure { .. } => true,
            Error::DownloadFailure { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// URL of the asset that triggered the error, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::DownloadFailure { url, .. }
            | Error::EmptyResponse { url, .. }
            | Error::NetworkFailure { url, .. }
            | Error::MalformedAssetUrl { url } => Some(url),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DownloadFailure { url, status } => {
                write!(f, "Download failed: {} returned HTTP {}", url, status)
            }
            Error::EmptyResponse { url, status } => {
                write!(f, "Download failed: {} returned HTTP {} with an empty body", url, status)
            }
            Error::NetworkFailure { url, cause } => {
                write!(f, "Network error fetching {}: {}", url, cause)
            }
            Error::MalformedAssetUrl { url } => {
                write!(f, "Malformed asset URL (no file extension): {}", url)
            }
            Error::FilesystemFailure { path, cause } => {
                write!(f, "Filesystem error at {}: {}", path.display(), cause)
            }
            Error::InvalidManifest(msg) => write!(f, "Invalid manifest: {}", msg),
            Error::ConfigParse(msg) => write!(f, "Configuration parse error: {}", msg),
            Error::HttpClient(msg) => write!(f, "Failed to build HTTP client: {}", msg),
            Error::PartiallyMaterialized { remote, local } => write!(
                f,
                "Manifest is partially materialized ({} remote, {} local fields); \
                 restore the remote manifest and run again",
                remote, local
            ),
            Error::Cancelled => write!(f, "Run cancelled before completion"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FilesystemFailure { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidManifest(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server_error = Error::DownloadFailure {
            url: "https://x/a.jpg".into(),
            status: 503,
        };
        assert!(server_error.is_transient());

        let not_found = Error::DownloadFailure {
            url: "https://x/a.jpg".into(),
            status: 404,
        };
        assert!(!not_found.is_transient());

        let reset = Error::NetworkFailure {
            url: "https://x/a.jpg".into(),
            cause: "connection reset".into(),
        };
        assert!(reset.is_transient());

        let no_content = Error::EmptyResponse {
            url: "https://x/a.jpg".into(),
            status: 204,
        };
        assert!(!no_content.is_transient());
        assert_eq!(no_content.url(), Some("https://x/a.jpg"));
        assert!(!Error::HttpClient("bad header".into()).is_transient());

        assert!(!Error::MalformedAssetUrl { url: "https://x/a".into() }.is_transient());
        assert!(!Error::Cancelled.is_transient());
    }

    #[test]
    fn test_display_includes_url_and_status() {
        let err = Error::DownloadFailure {
            url: "https://x/a.jpg".into(),
            status: 404,
        };
        let msg = err.to_string();
        assert!(msg.contains("https://x/a.jpg"));
        assert!(msg.contains("404"));
        assert_eq!(err.url(), Some("https://x/a.jpg"));
    }
}
