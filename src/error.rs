// ABOUTME: Application-wide error type for spandex.
// ABOUTME: Unions the module errors so commands can use `?` throughout.

use thiserror::Error;

use crate::cloud::{CloudError, CloudErrorKind};
use crate::config::ConfigError;
use crate::properties::PropertiesError;
use crate::remote::RemoteCommandError;
use crate::workflow::DeployError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    RemoteCommand(#[from] RemoteCommandError),

    #[error("cloud API error: {0}")]
    CloudApi(CloudError),

    #[error("provisioning timed out: {0}")]
    ProvisioningTimeout(CloudError),

    #[error("instance {0} has no public address to deploy to")]
    NoPublicAddress(String),

    #[error("invalid provisioning properties: {0}")]
    Properties(#[from] PropertiesError),

    #[error("deployment failed: {0}")]
    Deploy(#[from] DeployError),

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CloudError> for Error {
    fn from(err: CloudError) -> Self {
        match err.kind() {
            CloudErrorKind::ProvisioningTimeout => Error::ProvisioningTimeout(err),
            _ => Error::CloudApi(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
