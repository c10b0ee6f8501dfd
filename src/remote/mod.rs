// ABOUTME: Remote execution channel and idempotent convergence primitives.
// ABOUTME: Everything that touches the target host goes through `Remote`.

mod converge;
mod error;
mod runner;

pub use converge::{
    CLONE_ATTEMPTS, InstallOutcome, ProcessMatch, RepoOutcome, RestartOutcome, ensure_installed,
    ensure_process_restarted, ensure_repo_current, find_processes,
};
pub use error::RemoteCommandError;
pub use runner::{CommandRunner, Remote, privileged, shell_quote};
