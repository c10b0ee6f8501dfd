// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a config/dev.json template listing every key the loader reads.

use std::path::{Path, PathBuf};

use super::environment::Environment;
use super::error::ConfigError;

const TEMPLATE: &str = r#"{
  "user": "ubuntu",
  "ssh_keyfile": "~/.ssh/couchdb.pem",
  "project_name": "couchdb",

  "aws_access_key_id": "",
  "aws_secret_access_key": "",
  "aws_ami": "",
  "aws_keypair_name": "",
  "aws_ec2_region": "us-east-1",
  "aws_instance_type": "m1.small",
  "aws_security_group": "couchdb",

  "aws_ec2_availability_zone": null,
  "aws_elb_load_balancer": null,

  "poll_interval": "1s",
  "max_poll_attempts": 300,
  "settle_timeout": "60s",
  "settle_fallback": "10s"
}
"#;

/// Write the development config template under `dir/config/`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = Environment::Development.config_path(dir);

    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }

    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, TEMPLATE)
    };
    write(&path).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}
