// ABOUTME: Environment selectors and the config file each one resolves to.
// ABOUTME: Accepts the long names and the short aliases operators type.

use std::fmt;
use std::path::{Path, PathBuf};

use super::error::ConfigError;

pub const CONFIG_DIR: &str = "config";

/// A deployment environment with its own configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Production,
    Staging,
    Development,
    Local,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Production,
        Environment::Staging,
        Environment::Development,
        Environment::Local,
    ];

    /// Parse a selector. Case-insensitive; accepts `prod`, `test` and `dev`.
    pub fn parse(selector: &str) -> Option<Self> {
        match selector.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "staging" | "test" => Some(Environment::Staging),
            "development" | "dev" => Some(Environment::Development),
            "local" => Some(Environment::Local),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
            Environment::Local => "local",
        }
    }

    /// Uppercase label used in instance names.
    pub fn label(&self) -> String {
        self.name().to_ascii_uppercase()
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Environment::Production => "production.json",
            Environment::Staging => "staging.json",
            Environment::Development => "dev.json",
            Environment::Local => "local.json",
        }
    }

    pub fn config_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_DIR).join(self.file_name())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a configuration record comes from and which environment it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub environment_label: String,
}

/// Resolve the configuration source for a selector and optional override.
///
/// An explicit path always wins. Without one, the selector must name a known
/// environment.
pub fn resolve_source(
    selector: Option<&str>,
    override_path: Option<&Path>,
    base_dir: &Path,
) -> Result<ConfigSource, ConfigError> {
    let environment = selector.and_then(Environment::parse);

    if let Some(path) = override_path {
        let environment_label = match environment {
            Some(env) => env.label(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_ascii_uppercase())
                .unwrap_or_else(|| "CUSTOM".to_string()),
        };
        return Ok(ConfigSource {
            path: path.to_path_buf(),
            environment_label,
        });
    }

    match (selector, environment) {
        (_, Some(env)) => Ok(ConfigSource {
            path: env.config_path(base_dir),
            environment_label: env.label(),
        }),
        (Some(given), None) if !given.trim().is_empty() => Err(ConfigError::UnknownEnvironment {
            given: given.to_string(),
        }),
        _ => Err(ConfigError::NoEnvironment),
    }
}
