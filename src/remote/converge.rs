// ABOUTME: Idempotent convergence primitives for the remote host.
// ABOUTME: Install-if-absent, clone-or-update a repository, kill-then-restart a process.

use nonempty::NonEmpty;

use super::error::RemoteCommandError;
use super::runner::{Remote, shell_quote};

/// Total clone attempts: the first try plus exactly one retry.
pub const CLONE_ATTEMPTS: u32 = 2;

/// What `ensure_installed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyPresent,
}

/// What `ensure_repo_current` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOutcome {
    Cloned,
    Updated,
    /// The checkout has local changes and was not touched.
    LeftUntouched,
}

/// Run `install_steps` as root unless `marker_path` already exists.
///
/// Steps run in order and the first failure stops the sequence.
pub async fn ensure_installed(
    remote: &Remote<'_>,
    marker_path: &str,
    install_steps: &NonEmpty<String>,
) -> Result<InstallOutcome, RemoteCommandError> {
    if remote.path_exists(marker_path).await? {
        tracing::debug!("{} present, skipping install", marker_path);
        return Ok(InstallOutcome::AlreadyPresent);
    }

    tracing::info!(
        "{} absent, running {} install step(s)",
        marker_path,
        install_steps.len()
    );
    for step in install_steps.iter() {
        remote.run_privileged(step).await?;
    }
    Ok(InstallOutcome::Installed)
}

/// Clone `repo_url` into `path`, or pull if the checkout is clean.
///
/// A failed clone is retried once. A checkout with pending local changes is
/// left alone so operator edits on the host are never clobbered.
pub async fn ensure_repo_current(
    remote: &Remote<'_>,
    path: &str,
    repo_url: &str,
) -> Result<RepoOutcome, RemoteCommandError> {
    if !remote.path_exists(path).await? {
        clone(remote, path, repo_url).await?;
        return Ok(RepoOutcome::Cloned);
    }

    let checkout = remote.scoped(path);
    let status = checkout.run_privileged("git status --porcelain").await?;

    if status.stdout.trim().is_empty() {
        tracing::info!("{} is clean, pulling", path);
        checkout.run_privileged("git pull").await?;
        Ok(RepoOutcome::Updated)
    } else {
        tracing::warn!("{} has local changes, leaving it untouched", path);
        Ok(RepoOutcome::LeftUntouched)
    }
}

async fn clone(
    remote: &Remote<'_>,
    path: &str,
    repo_url: &str,
) -> Result<(), RemoteCommandError> {
    let command = format!("git clone {} {}", shell_quote(repo_url), shell_quote(path));
    let mut last_error = None;

    for attempt in 1..=CLONE_ATTEMPTS {
        match remote.run_privileged(&command).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    "clone of {} failed (attempt {}/{}): {}",
                    repo_url,
                    attempt,
                    CLONE_ATTEMPTS,
                    e
                );
                last_error = Some(e);
            }
        }
    }

    Err(RemoteCommandError::CloneFailed {
        repo: repo_url.to_string(),
        attempts: CLONE_ATTEMPTS,
        reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Selects running processes by command-line pattern and optional owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMatch {
    pub pattern: String,
    pub user: Option<String>,
}

impl ProcessMatch {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            user: None,
        }
    }

    pub fn owned_by(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// The pgrep invocation for this match.
    ///
    /// The first character is bracketed (`nrsysmond` becomes `[n]rsysmond`)
    /// so the shell running the search never matches itself.
    pub fn search_command(&self) -> String {
        let mut chars = self.pattern.chars();
        let pattern = match chars.next() {
            Some(first) if first.is_ascii_alphanumeric() => {
                format!("[{}]{}", first, chars.as_str())
            }
            _ => self.pattern.clone(),
        };

        match &self.user {
            Some(user) => format!(
                "pgrep -u {} -f {}",
                shell_quote(user),
                shell_quote(&pattern)
            ),
            None => format!("pgrep -f {}", shell_quote(&pattern)),
        }
    }
}

/// Outcome of `ensure_process_restarted`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartOutcome {
    /// PIDs that were found and signalled. Empty when nothing was running.
    pub killed: Vec<u32>,
}

/// PIDs of processes matching `process`. No match is an empty list.
pub async fn find_processes(
    remote: &Remote<'_>,
    process: &ProcessMatch,
) -> Result<Vec<u32>, RemoteCommandError> {
    let command = process.search_command();
    let output = remote.run_unchecked(&command).await?;

    match output.exit_code {
        0 => Ok(output
            .stdout
            .split_whitespace()
            .filter_map(|pid| pid.parse().ok())
            .collect()),
        // pgrep: no processes matched
        1 => Ok(Vec::new()),
        exit_code => Err(RemoteCommandError::Failed {
            command,
            exit_code,
            stderr: output.stderr.trim().to_string(),
        }),
    }
}

/// Kill any process matching `process`, then run `start_command` as root.
///
/// A missing process, a failed search and a failed kill are all tolerated.
/// Only a failing start is an error.
pub async fn ensure_process_restarted(
    remote: &Remote<'_>,
    process: &ProcessMatch,
    start_command: &str,
) -> Result<RestartOutcome, RemoteCommandError> {
    let pids = match find_processes(remote, process).await {
        Ok(pids) => pids,
        Err(e) => {
            tracing::warn!("could not search for {}: {}", process.pattern, e);
            Vec::new()
        }
    };

    if pids.is_empty() {
        tracing::debug!("no running process matches {}", process.pattern);
    } else {
        let list = pids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        match remote.run_privileged_unchecked(&format!("kill -9 {list}")).await {
            Ok(output) if !output.success() => {
                tracing::warn!(
                    "kill -9 {} exited {}: {}",
                    list,
                    output.exit_code,
                    output.stderr.trim()
                );
            }
            Err(e) => tracing::warn!("kill -9 {} failed: {}", list, e),
            Ok(_) => {}
        }
    }

    remote.run_privileged(start_command).await?;
    Ok(RestartOutcome { killed: pids })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_brackets_first_character() {
        let m = ProcessMatch::new("nrsysmond");
        assert_eq!(m.search_command(), "pgrep -f '[n]rsysmond'");
    }

    #[test]
    fn search_filters_by_owner() {
        let m = ProcessMatch::new("newrelic_plugin").owned_by("newrelic");
        assert_eq!(
            m.search_command(),
            "pgrep -u 'newrelic' -f '[n]ewrelic_plugin'"
        );
    }

    #[test]
    fn search_leaves_non_alphanumeric_pattern_alone() {
        let m = ProcessMatch::new("/usr/sbin/nrsysmond");
        assert_eq!(m.search_command(), "pgrep -f '/usr/sbin/nrsysmond'");
    }
}
