// ABOUTME: In-memory stand-in for a remote host, driven through CommandRunner.
// ABOUTME: Interprets the handful of shell commands the workflow issues and records every call.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

use spandex::remote::CommandRunner;
use spandex::ssh::{self, CommandOutput};

/// Split a POSIX shell line into words, honouring single quotes and backslashes.
pub fn shell_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '\\' => {
                in_word = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

/// One command as the host saw it, with the `cd` and `sudo` wrappers removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub line: String,
    pub cwd: Option<String>,
    pub privileged: bool,
}

struct Failure {
    pattern: String,
    exit_code: u32,
    remaining: Option<usize>,
}

#[derive(Default)]
struct HostState {
    files: BTreeMap<String, String>,
    processes: BTreeMap<u32, String>,
    executed: Vec<Executed>,
    failures: Vec<Failure>,
    effects: Vec<(String, String)>,
    dirty_checkouts: BTreeSet<String>,
    not_ready: bool,
}

/// A simulated host.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose package installs create the binaries they install.
    pub fn ubuntu() -> Self {
        Self::new()
            .with_file("/etc/rc.local", "#!/bin/sh -e\n#\n# rc.local\n#\nexit 0\n")
            .creates_on("apt-get -y install puppet", "/usr/bin/puppet")
            .creates_on("apt-get -y install newrelic-sysmond", "/usr/sbin/nrsysmond")
            .creates_on("python-pip", "/usr/bin/pip")
            .creates_on(
                "pip install newrelic-plugin-agent",
                "/usr/local/bin/newrelic_plugin_agent",
            )
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.state
            .get_mut()
            .files
            .insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_path(self, path: &str) -> Self {
        self.with_file(path, "")
    }

    pub fn with_process(mut self, pid: u32, command_line: &str) -> Self {
        self.state
            .get_mut()
            .processes
            .insert(pid, command_line.to_string());
        self
    }

    /// `git status --porcelain` in `path` reports local changes.
    pub fn dirty_checkout(mut self, path: &str) -> Self {
        self.state.get_mut().dirty_checkouts.insert(path.to_string());
        self
    }

    /// Every command containing `pattern` exits with `exit_code`.
    pub fn fail_on(mut self, pattern: &str, exit_code: u32) -> Self {
        self.state.get_mut().failures.push(Failure {
            pattern: pattern.to_string(),
            exit_code,
            remaining: None,
        });
        self
    }

    /// The first `times` commands containing `pattern` exit with `exit_code`.
    pub fn fail_times(mut self, pattern: &str, exit_code: u32, times: usize) -> Self {
        self.state.get_mut().failures.push(Failure {
            pattern: pattern.to_string(),
            exit_code,
            remaining: Some(times),
        });
        self
    }

    /// A successful command containing `pattern` creates `path`.
    pub fn creates_on(mut self, pattern: &str, path: &str) -> Self {
        self.state
            .get_mut()
            .effects
            .push((pattern.to_string(), path.to_string()));
        self
    }

    /// HTTP readiness probes fail.
    pub fn not_ready(mut self) -> Self {
        self.state.get_mut().not_ready = true;
        self
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().files.contains_key(path)
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().executed.clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.executed().into_iter().map(|e| e.line).collect()
    }

    /// Number of commands containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(pattern)).count()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.count(pattern) > 0
    }

    pub fn clear_log(&self) {
        self.state.lock().executed.clear();
    }

    fn handle(&self, raw: &str) -> CommandOutput {
        let mut state = self.state.lock();

        let (cwd, rest) = match raw.strip_prefix("cd ") {
            Some(_) => match raw.split_once(" && ") {
                Some((cd, rest)) => (shell_words(cd).get(1).cloned(), rest.to_string()),
                None => (None, raw.to_string()),
            },
            None => (None, raw.to_string()),
        };

        let outer = shell_words(&rest);
        let (line, privileged) = match outer.as_slice() {
            [sudo, n, sh, c, inner] if sudo == "sudo" && n == "-n" && sh == "sh" && c == "-c" => {
                (inner.clone(), true)
            }
            _ => (rest.clone(), false),
        };

        state.executed.push(Executed {
            line: line.clone(),
            cwd: cwd.clone(),
            privileged,
        });

        for failure in state.failures.iter_mut() {
            if !line.contains(&failure.pattern) {
                continue;
            }
            match &mut failure.remaining {
                Some(0) => continue,
                Some(n) => *n -= 1,
                None => {}
            }
            return exit(failure.exit_code, "", "simulated failure");
        }

        let resolve = |path: &str| match (&cwd, path.starts_with('/')) {
            (Some(dir), false) => format!("{}/{}", dir.trim_end_matches('/'), path),
            _ => path.to_string(),
        };

        let words = shell_words(&line);
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["test", "-e", path, "&&", "echo", "exists"] => {
                if state.files.contains_key(&resolve(*path)) {
                    exit(0, "exists\n", "")
                } else {
                    exit(1, "", "")
                }
            }
            ["test", "-e", path] => {
                if state.files.contains_key(&resolve(*path)) {
                    exit(0, "", "")
                } else {
                    exit(1, "", "")
                }
            }
            ["cat", path] => match state.files.get(&resolve(*path)) {
                Some(content) => exit(0, content, ""),
                None => exit(1, "", "No such file or directory"),
            },
            ["printf", "%s", content, ">", path] => {
                state.files.insert(resolve(*path), content.to_string());
                exit(0, "", "")
            }
            ["mkdir", "-p", path] | ["git", "clone", _, path] => {
                state.files.insert(resolve(*path), String::new());
                exit(0, "", "")
            }
            ["git", "status", "--porcelain"] => {
                let dirty = cwd
                    .as_ref()
                    .is_some_and(|dir| state.dirty_checkouts.contains(dir));
                exit(0, if dirty { " M manifests/init.pp\n" } else { "" }, "")
            }
            ["pgrep", .., "-f", pattern] => {
                let needle = pattern.replace(['[', ']'], "");
                let pids: Vec<String> = state
                    .processes
                    .iter()
                    .filter(|(_, cmd)| cmd.contains(&needle))
                    .map(|(pid, _)| pid.to_string())
                    .collect();
                if pids.is_empty() {
                    exit(1, "", "")
                } else {
                    exit(0, &format!("{}\n", pids.join("\n")), "")
                }
            }
            ["kill", "-9", pids @ ..] => {
                for pid in pids {
                    if let Ok(pid) = pid.parse() {
                        state.processes.remove(&pid);
                    }
                }
                exit(0, "", "")
            }
            ["curl", ..] if state.not_ready => exit(7, "", "connection refused"),
            _ => {
                let created: Vec<String> = state
                    .effects
                    .iter()
                    .filter(|(pattern, _)| line.contains(pattern.as_str()))
                    .map(|(_, path)| path.clone())
                    .collect();
                for path in created {
                    state.files.insert(path, String::new());
                }
                exit(0, "", "")
            }
        }
    }
}

fn exit(exit_code: u32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl CommandRunner for FakeHost {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput> {
        Ok(self.handle(command))
    }
}
