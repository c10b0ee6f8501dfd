// ABOUTME: Applies a Puppet module to the host with a single declarative call.
// ABOUTME: Parameters are rendered by `render` and never retried on failure.

mod render;

pub use render::{ModuleParams, ModuleValue, render_class};

use crate::remote::{Remote, RemoteCommandError, shell_quote};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("puppet apply of module '{module}' failed: {source}")]
    Failed {
        module: String,
        #[source]
        source: RemoteCommandError,
    },
}

/// Build the `puppet apply` command line for a class declaration.
pub fn apply_command(module_name: &str, params: &ModuleParams) -> String {
    format!("puppet apply -e {}", shell_quote(&render_class(module_name, params)))
}

/// Apply `module_name` with the truthy subset of `params`.
///
/// Failure is returned to the caller untouched: a broken module needs an
/// operator, not another attempt.
pub async fn apply(
    remote: &Remote<'_>,
    module_name: &str,
    params: &ModuleParams,
) -> Result<(), ApplyError> {
    let params = params.truthy();
    tracing::info!("applying module '{}' with {} parameter(s)", module_name, params.len());

    remote
        .run_privileged(&apply_command(module_name, &params))
        .await
        .map_err(|source| ApplyError::Failed {
            module: module_name.to_string(),
            source,
        })?;
    Ok(())
}
