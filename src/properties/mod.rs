// ABOUTME: Provisioning properties: the desired CouchDB module state for one host.
// ABOUTME: Raw answers are validated into a value whose invariants hold by construction.

mod input;

pub use input::{Prompter, StdinPrompter, from_file, gather, gather_monitoring};

use serde::Deserialize;
use thiserror::Error;

use crate::module::ModuleParams;

pub const DEFAULT_BIND: &str = "0.0.0.0";

#[derive(Debug, Error)]
pub enum PropertiesError {
    #[error("master hostname is required in {0} mode")]
    MissingMasterHostname(&'static str),

    #[error("master IP address is required in {0} mode")]
    MissingMasterIp(&'static str),

    #[error("admin password is required when an admin user is given")]
    MissingAdminPassword,

    #[error("failed to read properties: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse properties: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Raw, unvalidated answers as gathered from an operator or a file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PropertiesInput {
    pub bind: Option<String>,
    pub database_dir: Option<String>,
    pub admin_user: Option<String>,
    pub admin_password: Option<String>,
    #[serde(alias = "couchdb_masterless_mode")]
    pub masterless_mode: bool,
    pub slave_mode: bool,
    #[serde(alias = "couchdb_master_hostname")]
    pub master_hostname: Option<String>,
    #[serde(alias = "couchdb_master_ip")]
    pub master_ip: Option<String>,
}

/// Credentials for the CouchDB admin account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub user: String,
    pub password: String,
}

/// The master a replicating node follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Master {
    pub hostname: String,
    pub ip: String,
}

/// Replication role of the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterMode {
    Standalone,
    Masterless(Master),
    Slave(Master),
}

impl ClusterMode {
    pub fn is_masterless(&self) -> bool {
        matches!(self, ClusterMode::Masterless(_))
    }

    pub fn is_slave(&self) -> bool {
        matches!(self, ClusterMode::Slave(_))
    }

    /// Whether the node replicates from a master.
    pub fn replicates(&self) -> bool {
        !matches!(self, ClusterMode::Standalone)
    }

    pub fn master(&self) -> Option<&Master> {
        match self {
            ClusterMode::Standalone => None,
            ClusterMode::Masterless(m) | ClusterMode::Slave(m) => Some(m),
        }
    }
}

/// Validated provisioning properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningProperties {
    pub bind: String,
    pub database_dir: Option<String>,
    pub admin: Option<AdminCredentials>,
    pub cluster: ClusterMode,
}

impl Default for ProvisioningProperties {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_dir: None,
            admin: None,
            cluster: ClusterMode::Standalone,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl PropertiesInput {
    /// Validate into `ProvisioningProperties`.
    ///
    /// Masterless mode wins over slave mode. Either one requires both master
    /// fields to be non-empty.
    pub fn validate(self) -> Result<ProvisioningProperties, PropertiesError> {
        let admin = match (non_empty(self.admin_user), non_empty(self.admin_password)) {
            (Some(user), Some(password)) => Some(AdminCredentials { user, password }),
            (Some(_), None) => return Err(PropertiesError::MissingAdminPassword),
            (None, _) => None,
        };

        let mode = if self.masterless_mode {
            Some("masterless")
        } else if self.slave_mode {
            Some("slave")
        } else {
            None
        };

        let cluster = match mode {
            None => ClusterMode::Standalone,
            Some(mode) => {
                let hostname = non_empty(self.master_hostname)
                    .ok_or(PropertiesError::MissingMasterHostname(mode))?;
                let ip = non_empty(self.master_ip).ok_or(PropertiesError::MissingMasterIp(mode))?;
                let master = Master { hostname, ip };
                if self.masterless_mode {
                    ClusterMode::Masterless(master)
                } else {
                    ClusterMode::Slave(master)
                }
            }
        };

        Ok(ProvisioningProperties {
            bind: non_empty(self.bind).unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_dir: non_empty(self.database_dir),
            admin,
            cluster,
        })
    }
}

impl ProvisioningProperties {
    /// Parameters for the couchdb module, including the host's own name.
    pub fn module_params(&self, hostname: &str) -> ModuleParams {
        let mut params = ModuleParams::new();
        params
            .set("bind", self.bind.as_str())
            .set("database_dir", self.database_dir.clone())
            .set("admin_user", self.admin.as_ref().map(|a| a.user.clone()))
            .set("admin_password", self.admin.as_ref().map(|a| a.password.clone()))
            .set("couchdb_masterless_mode", self.cluster.is_masterless())
            .set("slave_mode", self.cluster.is_slave())
            .set(
                "couchdb_master_hostname",
                self.cluster.master().map(|m| m.hostname.clone()),
            )
            .set("couchdb_master_ip", self.cluster.master().map(|m| m.ip.clone()))
            .set("couchdb_hostname", hostname);
        params
    }
}

/// New Relic monitoring settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringConfig {
    pub license_key: String,
}

/// Operator choices for a deploy that are not module properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    pub setup_database: bool,
    pub flush_database: bool,
    pub monitoring: Option<MonitoringConfig>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            setup_database: true,
            flush_database: true,
            monitoring: None,
        }
    }
}
