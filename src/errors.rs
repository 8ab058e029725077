use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for bot configuration, fetch, store, and upload failures.
#[derive(Debug, Error)]
pub enum BotError {
    /// The per-bot configuration file does not exist. Fatal before any
    /// fetch or merge is attempted.
    #[error("config file not found at {path}")]
    ConfigMissing {
        /// Path that was probed for the configuration file.
        path: PathBuf,
    },
    /// A configuration value exists but cannot be used.
    #[error("invalid configuration ({context}): {reason}")]
    ConfigInvalid {
        /// Config file path or setting name the value came from.
        context: String,
        /// Parse or validation failure detail.
        reason: String,
    },
    /// Network, HTTP-status, or body-parse failure while fetching a source.
    #[error("fetch from '{url}' failed: {reason}")]
    Fetch {
        /// URL the fetch was issued against.
        url: String,
        /// Transport or parse failure detail.
        reason: String,
    },
    /// A persisted record store exists but is not an ordered sequence of
    /// flat records. Never silently treated as empty.
    #[error("record store '{context}' is malformed: {reason}")]
    MalformedHistory {
        /// File path or payload description the history came from.
        context: String,
        /// What made the payload unusable.
        reason: String,
    },
    /// Object-storage upload failure. Local state stays authoritative.
    #[error("upload to '{destination}' failed: {reason}")]
    Upload {
        /// Remote destination (`bucket/key` or directory-level target).
        destination: String,
        /// SDK or transport failure detail.
        reason: String,
    },
    /// Filesystem failure while reading or writing local bot files.
    #[error(transparent)]
    Io(#[from] io::Error),
}
