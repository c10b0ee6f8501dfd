// ABOUTME: Boot script amendment, applied once per host behind the Deployment Marker.
// ABOUTME: Pure text transform so the resulting rc.local can be checked without a host.

use std::time::Duration;

/// Interpreter line for a script that has none. rc-local runs the file directly.
pub const DEFAULT_SHEBANG: &str = "#!/bin/sh -e";

/// Commands appended to the boot script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootCommands {
    pub module_dir: String,
    pub settle: Duration,
    /// Run on boot when the node is masterless.
    pub replication: Option<String>,
    /// Monitoring plugin start, when monitoring is on.
    pub monitoring: Option<String>,
}

impl BootCommands {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("cd {}", self.module_dir),
            // sleep takes whole seconds
            format!("sleep {}", self.settle.as_secs().max(1)),
        ];
        lines.extend(self.replication.iter().cloned());
        lines.extend(self.monitoring.iter().cloned());
        lines
    }
}

/// Rewrite an rc.local: keep its commands, append ours, end with one `exit 0`.
///
/// Comment lines are dropped except a leading shebang, which is added when
/// missing. Every existing `exit 0` is removed so the appended commands are
/// reachable.
pub fn amend_boot_script(existing: &str, commands: &BootCommands) -> String {
    let mut out: Vec<&str> = Vec::new();

    for (index, line) in existing.lines().enumerate() {
        let trimmed = line.trim();
        if index == 0 && trimmed.starts_with("#!") {
            out.push(line);
            continue;
        }
        if trimmed.starts_with('#') || trimmed == "exit 0" {
            continue;
        }
        out.push(line);
    }

    if !out.first().is_some_and(|l| l.trim().starts_with("#!")) {
        out.insert(0, DEFAULT_SHEBANG);
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }

    let mut script = out.join("\n");
    script.push_str("\n\n");
    for line in commands.lines() {
        script.push_str(&line);
        script.push('\n');
    }
    script.push_str("\nexit 0\n");
    script
}
