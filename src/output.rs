// ABOUTME: Operator-facing output for CLI commands.
// ABOUTME: Normal text, quiet (final result only), or JSON lines for scripting.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Warning;
use crate::workflow::{DeployReport, StepStatus};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress messages and a summary.
    Normal,
    /// Only the final result.
    Quiet,
    /// One JSON object per line.
    Json,
}

/// Prints progress, warnings and results according to the mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    fn duration_secs(&self) -> Option<f64> {
        self.start_time.map(|t| t.elapsed().as_secs_f64())
    }

    fn emit<T: Serialize>(&self, event: &str, message: &str, data: Option<&T>) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: self.duration_secs(),
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            println!("{json}");
        }
    }

    /// Print a progress message (normal mode only).
    pub fn progress(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => println!("{message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit::<()>("progress", message, None),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, warning: &Warning) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Warning: {}", warning.message)
            }
            OutputMode::Json => self.emit("warning", &warning.message, Some(&warning.kind)),
        }
    }

    /// Print the per-step summary of a deployment.
    pub fn report(&self, report: &DeployReport) {
        match self.mode {
            OutputMode::Normal => {
                for record in &report.steps {
                    let status = match record.status {
                        StepStatus::Changed => "changed",
                        StepStatus::Unchanged => "ok",
                        StepStatus::Skipped => "skipped",
                    };
                    match &record.detail {
                        Some(detail) => println!("  {:<22} {status} ({detail})", record.step),
                        None => println!("  {:<22} {status}", record.step),
                    }
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit("report", &report.host, Some(report)),
        }
    }

    /// Print a success message, with timing when a timer is running.
    pub fn success(&self, message: &str) {
        self.success_with::<()>(message, None);
    }

    /// Print a success message carrying a structured result for JSON mode.
    pub fn success_with<T: Serialize>(&self, message: &str, data: Option<&T>) {
        match self.mode {
            OutputMode::Normal => match self.duration_secs() {
                Some(elapsed) => println!("{message} ({elapsed:.1}s)"),
                None => println!("{message}"),
            },
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit("success", message, data),
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}
