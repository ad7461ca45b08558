//! Error taxonomy for the poller.
//!
//! None of these are fatal inside a running loop: each is caught at its
//! call site and turned into a neutral result (fallback endpoint set,
//! unhealthy report, empty batch). They exist so the call sites can log
//! *why* something degraded.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollerError {
    /// The endpoint registry could not be reached or returned junk.
    #[error("endpoint directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// A history response was missing its action list.
    #[error("action fetch failed for {endpoint}: {reason}")]
    FetchFailed { endpoint: String, reason: String },

    /// Invalid or unreadable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

pub type Result<T> = std::result::Result<T, PollerError>;
