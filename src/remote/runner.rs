// ABOUTME: The remote execution channel: run, run_privileged, path_exists, scoped.
// ABOUTME: Works over any CommandRunner, the SSH session in production.

use async_trait::async_trait;

use super::error::RemoteCommandError;
use crate::ssh::{self, CommandOutput, Session};

/// Something that can execute a shell command line on the target host.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput>;
}

#[async_trait]
impl CommandRunner for Session {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput> {
        Session::exec(self, command).await
    }
}

/// Quote a string for POSIX sh using single quotes.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Wrap a command so it runs as root without prompting for a password.
pub fn privileged(command: &str) -> String {
    format!("sudo -n sh -c {}", shell_quote(command))
}

/// Handle to the remote host, optionally bound to a working directory.
///
/// `scoped` returns a new handle whose commands run inside the given
/// directory. The original handle is untouched, so the working context is
/// restored as soon as the scoped value goes out of use.
#[derive(Clone)]
pub struct Remote<'a> {
    runner: &'a dyn CommandRunner,
    cwd: Option<String>,
}

impl std::fmt::Debug for Remote<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remote").field("cwd", &self.cwd).finish()
    }
}

impl<'a> Remote<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner, cwd: None }
    }

    /// A handle whose commands run inside `dir`.
    pub fn scoped(&self, dir: &str) -> Remote<'a> {
        Remote {
            runner: self.runner,
            cwd: Some(dir.to_string()),
        }
    }

    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    fn in_cwd(&self, command: &str) -> String {
        match &self.cwd {
            Some(dir) => format!("cd {} && {}", shell_quote(dir), command),
            None => command.to_string(),
        }
    }

    /// Run a command and return its output regardless of exit status.
    pub async fn run_unchecked(&self, command: &str) -> Result<CommandOutput, RemoteCommandError> {
        Ok(self.runner.exec(&self.in_cwd(command)).await?)
    }

    /// Run a command, failing on non-zero exit.
    pub async fn run(&self, command: &str) -> Result<CommandOutput, RemoteCommandError> {
        let output = self.run_unchecked(command).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(RemoteCommandError::Failed {
                command: command.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    /// Run a command as root, failing on non-zero exit.
    pub async fn run_privileged(&self, command: &str) -> Result<CommandOutput, RemoteCommandError> {
        self.run(&privileged(command)).await
    }

    /// Run a command as root and return its output regardless of exit status.
    pub async fn run_privileged_unchecked(
        &self,
        command: &str,
    ) -> Result<CommandOutput, RemoteCommandError> {
        self.run_unchecked(&privileged(command)).await
    }

    /// Whether `path` exists. Relative paths resolve against the scope.
    pub async fn path_exists(&self, path: &str) -> Result<bool, RemoteCommandError> {
        let output = self
            .run_unchecked(&format!("test -e {} && echo exists", shell_quote(path)))
            .await?;
        Ok(output.success() && output.stdout.trim() == "exists")
    }

    /// Contents of `path` read as root, or `None` when it does not exist.
    pub async fn read_file_privileged(
        &self,
        path: &str,
    ) -> Result<Option<String>, RemoteCommandError> {
        if !self.path_exists(path).await? {
            return Ok(None);
        }
        let output = self.run_privileged(&format!("cat {}", shell_quote(path))).await?;
        Ok(Some(output.stdout))
    }

    /// Replace the contents of `path` as root.
    pub async fn write_file_privileged(
        &self,
        path: &str,
        content: &str,
    ) -> Result<(), RemoteCommandError> {
        let command = format!(
            "printf '%s' {} > {}",
            shell_quote(content),
            shell_quote(path)
        );
        self.run_privileged(&command).await?;
        Ok(())
    }
}
