// ABOUTME: Environment-scoped configuration records and their validation.
// ABOUTME: Every required key is checked before the typed record is built.

mod deserialize;
mod environment;
mod error;
mod init;

pub use environment::{CONFIG_DIR, ConfigSource, Environment, resolve_source};
pub use error::{ACCEPTED_ENVIRONMENTS, ConfigError};
pub use init::init_config;

use nonempty::NonEmpty;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ssh::SessionConfig;

pub const DEFAULT_MODULE_REPO: &str = "https://github.com/wieden-kennedy/spandex-couch";

/// Required keys in reporting order, with the legacy alias each one accepts.
pub const REQUIRED_KEYS: [(&str, Option<&str>); 10] = [
    ("user", None),
    ("ssh_keyfile", None),
    ("project_name", None),
    ("aws_access_key_id", None),
    ("aws_secret_access_key", None),
    ("ami_id", Some("aws_ami")),
    ("keypair_name", Some("aws_keypair_name")),
    ("region", Some("aws_ec2_region")),
    ("instance_type", Some("aws_instance_type")),
    ("security_group", Some("aws_security_group")),
];

/// Optional keys that also accept a legacy alias.
const OPTIONAL_ALIASES: [(&str, &str); 2] = [
    ("availability_zone", "aws_ec2_availability_zone"),
    ("elb_name", "aws_elb_load_balancer"),
];

/// A value that must never show up in logs.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// The configuration record for one environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Uppercase environment label, e.g. `PRODUCTION`. Not read from the file.
    #[serde(skip)]
    pub environment: String,

    pub user: String,
    pub ssh_keyfile: PathBuf,
    pub project_name: String,

    pub aws_access_key_id: String,
    pub aws_secret_access_key: Secret,

    #[serde(alias = "aws_ami")]
    pub ami_id: String,

    #[serde(alias = "aws_keypair_name")]
    pub keypair_name: String,

    #[serde(alias = "aws_ec2_region")]
    pub region: String,

    #[serde(alias = "aws_instance_type")]
    pub instance_type: String,

    #[serde(alias = "aws_security_group", deserialize_with = "deserialize::security_groups")]
    pub security_group: NonEmpty<String>,

    #[serde(
        default,
        alias = "aws_ec2_availability_zone",
        deserialize_with = "deserialize::optional_string"
    )]
    pub availability_zone: Option<String>,

    #[serde(
        default,
        alias = "aws_elb_load_balancer",
        deserialize_with = "deserialize::optional_string"
    )]
    pub elb_name: Option<String>,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    #[serde(default = "default_true")]
    pub trust_first_connection: bool,

    #[serde(default = "default_module_repo")]
    pub module_repo: String,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    #[serde(default = "default_settle_timeout", with = "humantime_serde")]
    pub settle_timeout: Duration,

    #[serde(default = "default_settle_fallback", with = "humantime_serde")]
    pub settle_fallback: Duration,

    #[serde(default = "default_ssh_connect_attempts")]
    pub ssh_connect_attempts: u32,

    #[serde(default = "default_ssh_connect_delay", with = "humantime_serde")]
    pub ssh_connect_delay: Duration,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_true() -> bool {
    true
}

fn default_module_repo() -> String {
    DEFAULT_MODULE_REPO.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_poll_attempts() -> u32 {
    300
}

fn default_settle_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_settle_fallback() -> Duration {
    Duration::from_secs(10)
}

fn default_ssh_connect_attempts() -> u32 {
    30
}

fn default_ssh_connect_delay() -> Duration {
    Duration::from_secs(5)
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Sequence(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Required keys that are absent, null or blank, in `REQUIRED_KEYS` order.
pub fn missing_keys(mapping: &Mapping) -> Vec<String> {
    REQUIRED_KEYS
        .iter()
        .filter(|(key, alias)| {
            !is_present(mapping.get(*key)) && !alias.is_some_and(|a| is_present(mapping.get(a)))
        })
        .map(|(key, _)| key.to_string())
        .collect()
}

/// The first key given under both its canonical name and its alias.
fn duplicated_alias(mapping: &Mapping) -> Option<(&'static str, &'static str)> {
    REQUIRED_KEYS
        .iter()
        .filter_map(|&(key, alias)| alias.map(|a| (key, a)))
        .chain(OPTIONAL_ALIASES)
        .find(|&(key, alias)| mapping.contains_key(key) && mapping.contains_key(alias))
}

impl Config {
    /// Parse and validate a configuration document (JSON or YAML).
    pub fn parse(text: &str, environment: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(text)?;
        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => {
                return Err(ConfigError::Invalid(
                    "expected a mapping of configuration keys".to_string(),
                ));
            }
        };

        let missing = missing_keys(&mapping);
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }
        if let Some((key, alias)) = duplicated_alias(&mapping) {
            return Err(ConfigError::Invalid(format!(
                "{key} is set twice, as '{key}' and as its alias '{alias}'; keep one"
            )));
        }

        let mut config: Config = serde_yaml::from_value(Value::Mapping(mapping))?;
        config.environment = environment.to_string();
        Ok(config)
    }

    /// Read and validate the configuration at `source`.
    pub fn from_source(source: &ConfigSource) -> Result<Self, ConfigError> {
        if !source.path.is_file() {
            return Err(ConfigError::NotFound(source.path.clone()));
        }
        let text = std::fs::read_to_string(&source.path).map_err(|e| ConfigError::Read {
            path: source.path.clone(),
            source: e,
        })?;
        Self::parse(&text, &source.environment_label)
    }

    /// Resolve the source for a selector/override and load it.
    pub fn load(
        selector: Option<&str>,
        override_path: Option<&Path>,
        base_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let source = resolve_source(selector, override_path, base_dir)?;
        tracing::debug!("loading configuration from {}", source.path.display());
        Self::from_source(&source)
    }

    /// SSH settings for reaching `host` as the configured user.
    pub fn session_config(&self, host: &str) -> SessionConfig {
        SessionConfig::new(host, &self.user)
            .port(self.ssh_port)
            .key_path(expand_home(&self.ssh_keyfile))
            .trust_on_first_use(self.trust_first_connection)
    }
}

/// Expand a leading `~/` against $HOME.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
