// ABOUTME: SSH-specific error types.
// ABOUTME: Separates retryable connection failures from key and login failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("could not reach {host} over SSH after {attempts} attempts: {last}")]
    Unreachable {
        host: String,
        attempts: u32,
        last: String,
    },

    #[error("authentication failed: no valid credentials")]
    AuthenticationFailed,

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(std::time::Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

impl Error {
    /// Whether a fresh attempt could plausibly succeed (host still booting).
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Protocol(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
