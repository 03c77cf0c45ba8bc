//! Error types shared by the transport, the cache and every fetcher.

use thiserror::Error;

/// Why a remote request did not produce a value.
///
/// `Clone` because one in-flight request hands the same outcome to every
/// caller waiting on its key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network failure while requesting {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} did not respond within {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u32 },

    #[error("could not parse {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("{url} has no entry named {entry:?}")]
    MissingEntry { url: String, entry: String },
}

impl FetchError {
    pub fn parse(url: &str, reason: impl Into<String>) -> Self {
        FetchError::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the host answered that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// Outcome of a fetch: `Ok(None)` is a structural absence, not a failure.
pub type FetchResult<T> = Result<Option<T>, FetchError>;
