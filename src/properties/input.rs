// ABOUTME: Input phase for provisioning properties, kept apart from the workflow.
// ABOUTME: Answers come from a prompter (stdin) or a YAML/JSON properties file.

use std::io::{self, BufRead, Write};
use std::path::Path;

use super::{MonitoringConfig, PropertiesError, PropertiesInput};

/// Source of operator answers.
pub trait Prompter {
    /// Ask a question. An empty answer means "take the default".
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Prompts on stdout and reads answers line by line from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{question} ")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for an answer",
            ));
        }
        Ok(line.trim().to_string())
    }
}

fn optional(prompter: &mut dyn Prompter, question: &str) -> io::Result<Option<String>> {
    let answer = prompter.ask(question)?;
    Ok((!answer.is_empty()).then_some(answer))
}

fn required(prompter: &mut dyn Prompter, question: &str) -> io::Result<String> {
    loop {
        let answer = prompter.ask(question)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}

fn yes_no(prompter: &mut dyn Prompter, question: &str) -> io::Result<bool> {
    let answer = prompter.ask(question)?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Ask the operator for every property, re-asking required ones until answered.
pub fn gather(prompter: &mut dyn Prompter) -> Result<PropertiesInput, PropertiesError> {
    let mut input = PropertiesInput {
        bind: optional(prompter, "CouchDB bind address [0.0.0.0]:")?,
        database_dir: optional(prompter, "CouchDB database dir [/usr/local/var/lib/couchdb]:")?,
        admin_user: optional(prompter, "CouchDB admin user [None]:")?,
        ..Default::default()
    };

    if input.admin_user.is_some() {
        input.admin_password = Some(required(prompter, "CouchDB admin password (required):")?);
    }

    input.masterless_mode = yes_no(prompter, "Run as part of a masterless cluster [y/N]:")?;
    if !input.masterless_mode {
        input.slave_mode = yes_no(prompter, "Run as a slave to another master [y/N]:")?;
    }

    if input.masterless_mode || input.slave_mode {
        input.master_hostname = Some(required(
            prompter,
            "Hostname of CouchDB master server (required):",
        )?);
        input.master_ip = Some(required(
            prompter,
            "IP address of CouchDB master server (required):",
        )?);
    }

    Ok(input)
}

/// Ask whether to set up New Relic and, if so, for the license key.
pub fn gather_monitoring(
    prompter: &mut dyn Prompter,
) -> Result<Option<MonitoringConfig>, PropertiesError> {
    if !yes_no(prompter, "Set up New Relic monitoring [y/N]:")? {
        return Ok(None);
    }
    let license_key = required(prompter, "New Relic license key (required):")?;
    Ok(Some(MonitoringConfig { license_key }))
}

/// Read properties from a YAML or JSON file for headless runs.
pub fn from_file(path: &Path) -> Result<PropertiesInput, PropertiesError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}
