// ABOUTME: Immutable deployment context threaded through every workflow step.
// ABOUTME: Holds the target identity, properties, options, remote paths and settle policy.

use std::time::Duration;

use nonempty::NonEmpty;

use crate::config::{Config, DEFAULT_MODULE_REPO};
use crate::module::ModuleParams;
use crate::properties::{DeployOptions, ProvisioningProperties};
use crate::remote::shell_quote;

/// Well-known locations on the target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Presence of this file means the Puppet agent is installed.
    pub agent_binary: String,
    pub modules_dir: String,
    pub module_name: String,
    pub repo_url: String,
    /// Deployment Marker.
    pub marker: String,
    pub boot_script: String,
    pub setup_script: String,
    pub replication_script: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            agent_binary: "/usr/bin/puppet".to_string(),
            modules_dir: "/etc/puppet/modules".to_string(),
            module_name: "couchdb".to_string(),
            repo_url: DEFAULT_MODULE_REPO.to_string(),
            marker: "/etc/puppet/.couchdb.deployed".to_string(),
            boot_script: "/etc/rc.local".to_string(),
            setup_script: "/usr/local/sbin/couchdb_setup.py".to_string(),
            replication_script: "/usr/local/sbin/database_replication.py".to_string(),
        }
    }
}

impl Paths {
    pub fn with_repo(mut self, url: impl Into<String>) -> Self {
        self.repo_url = url.into();
        self
    }

    /// Checkout directory of the module repository.
    pub fn module_dir(&self) -> String {
        format!("{}/{}", self.modules_dir.trim_end_matches('/'), self.module_name)
    }

    pub fn boot_backup(&self) -> String {
        format!("{}.bak", self.boot_script)
    }

    /// `/usr/bin/python <replication script>`.
    pub fn replication_command(&self) -> String {
        format!("/usr/bin/python {}", self.replication_script)
    }

    /// The database setup script with flags for the two toggles.
    pub fn setup_command(&self, setup_database: bool, flush_database: bool) -> String {
        let mut command = format!("/usr/bin/python {}", self.setup_script);
        if setup_database {
            command.push_str(" -setup-database");
        }
        if flush_database {
            command.push_str(" -flush");
        }
        command
    }

    /// Apt steps that install the Puppet agent.
    pub fn agent_install_steps(&self) -> NonEmpty<String> {
        NonEmpty {
            head: "wget https://apt.puppetlabs.com/puppetlabs-release-precise.deb \
                   -O /tmp/puppetlabs-release-precise.deb"
                .to_string(),
            tail: vec![
                "dpkg -i /tmp/puppetlabs-release-precise.deb".to_string(),
                "apt-get -y update".to_string(),
                "apt-get -y install puppet".to_string(),
            ],
        }
    }
}

/// Something to poll until the database answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessProbe {
    /// Succeeds when `curl -sf` gets a 2xx from the URL.
    Http(String),
    /// Succeeds when the path exists.
    Path(String),
}

impl ReadinessProbe {
    pub fn command(&self) -> String {
        match self {
            ReadinessProbe::Http(url) => format!("curl -sf -o /dev/null {}", shell_quote(url)),
            ReadinessProbe::Path(path) => format!("test -e {}", shell_quote(path)),
        }
    }
}

/// How to wait for the database after the module is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleConfig {
    pub probe: Option<ReadinessProbe>,
    pub timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Sleep used when there is no probe.
    pub fallback: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            probe: Some(ReadinessProbe::Http("http://127.0.0.1:5984/".to_string())),
            timeout: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            fallback: Duration::from_secs(10),
        }
    }
}

impl SettleConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.settle_timeout,
            fallback: config.settle_fallback,
            ..Self::default()
        }
    }

    /// No waiting at all. The probe still runs once.
    pub fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            fallback: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Everything a deployment needs to know, fixed before the first step runs.
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    /// Login user on the target host.
    pub user: String,
    /// Host name the database announces to its peers.
    pub host: String,
    pub properties: ProvisioningProperties,
    pub options: DeployOptions,
    pub paths: Paths,
    pub settle: SettleConfig,
}

impl DeploymentContext {
    pub fn new(
        user: impl Into<String>,
        host: impl Into<String>,
        properties: ProvisioningProperties,
        options: DeployOptions,
    ) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            properties,
            options,
            paths: Paths::default(),
            settle: SettleConfig::default(),
        }
    }

    pub fn with_paths(mut self, paths: Paths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_settle(mut self, settle: SettleConfig) -> Self {
        self.settle = settle;
        self
    }

    pub fn home_dir(&self) -> String {
        format!("/home/{}", self.user)
    }

    pub fn module_params(&self) -> ModuleParams {
        self.properties.module_params(&self.host)
    }
}
