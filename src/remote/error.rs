// ABOUTME: Error type for commands executed on the remote host.
// ABOUTME: Distinguishes non-zero exits from transport failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteCommandError {
    /// The command ran and exited non-zero.
    #[error("remote command `{command}` exited with status {exit_code}: {stderr}")]
    Failed {
        command: String,
        exit_code: u32,
        stderr: String,
    },

    /// Cloning kept failing after the single permitted retry.
    #[error("cloning {repo} failed after {attempts} attempts: {reason}")]
    CloneFailed {
        repo: String,
        attempts: u32,
        reason: String,
    },

    /// The command could not be delivered or its result was lost.
    #[error("transport error: {0}")]
    Transport(#[from] crate::ssh::Error),
}

impl RemoteCommandError {
    /// Exit code of the failed command, if it got as far as running.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            RemoteCommandError::Failed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
