// ABOUTME: Configuration errors, all raised before any remote work starts.
// ABOUTME: Missing keys are reported by name, never as a bare "invalid config".

use std::path::PathBuf;
use thiserror::Error;

pub const ACCEPTED_ENVIRONMENTS: &str = "production (prod), staging (test), development (dev), local";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no environment selected: set COUCHENV or --env to one of {accepted}, or pass --config <path>",
        accepted = ACCEPTED_ENVIRONMENTS
    )]
    NoEnvironment,

    #[error(
        "unknown environment '{given}': expected one of {accepted}, or pass --config <path>",
        accepted = ACCEPTED_ENVIRONMENTS
    )]
    UnknownEnvironment { given: String },

    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("missing required configuration keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}
