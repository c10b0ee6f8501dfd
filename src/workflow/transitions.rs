// ABOUTME: State transition methods for the deployment workflow.
// ABOUTME: Each method consumes self and returns the next state on success.

use chrono::Utc;

use crate::module;
use crate::remote::{
    InstallOutcome, RepoOutcome, ensure_installed, ensure_repo_current, shell_quote,
};

use super::Deployment;
use super::boot::{BootCommands, amend_boot_script};
use super::error::{DeployError, RemoteErrorExt, Step};
use super::maintenance::{self, plugin_start_command};
use super::readiness::wait_until_ready;
use super::report::{DeployReport, StepStatus};
use super::state::{
    BootConfigured, DatabaseReady, Done, Fresh, ModuleApplied, ModuleUpdated,
    MonitoringConfigured, PuppetInstalled, Replicated,
};

impl<'r, S> Deployment<'r, S> {
    fn advance<T>(self, state: T) -> Deployment<'r, T> {
        Deployment {
            remote: self.remote,
            ctx: self.ctx,
            report: self.report,
            state,
        }
    }
}

// =============================================================================
// Fresh
// =============================================================================

impl<'r> Deployment<'r, Fresh> {
    /// Create the user's home directory and the database directory if absent.
    pub async fn prepare_host(mut self) -> Result<Self, DeployError> {
        let mut created = Vec::new();

        let home = self.ctx.home_dir();
        if !self.remote.path_exists(&home).await.during(Step::PrepareHost)? {
            let owner = format!("{0}:{0}", self.ctx.user);
            self.remote
                .run_privileged(&format!("mkdir -p {}", shell_quote(&home)))
                .await
                .during(Step::PrepareHost)?;
            self.remote
                .run_privileged(&format!("chown {} {}", shell_quote(&owner), shell_quote(&home)))
                .await
                .during(Step::PrepareHost)?;
            created.push(home);
        }

        if let Some(dir) = self.ctx.properties.database_dir.clone()
            && !self.remote.path_exists(&dir).await.during(Step::PrepareHost)?
        {
            self.remote
                .run_privileged(&format!("mkdir -p {}", shell_quote(&dir)))
                .await
                .during(Step::PrepareHost)?;
            created.push(dir);
        }

        if created.is_empty() {
            self.report
                .record(Step::PrepareHost, StepStatus::Unchanged, None);
        } else {
            self.report.record(
                Step::PrepareHost,
                StepStatus::Changed,
                Some(format!("created {}", created.join(", "))),
            );
        }
        Ok(self)
    }

    /// Install the Puppet agent unless it is already present.
    pub async fn install_agent(mut self) -> Result<Deployment<'r, PuppetInstalled>, DeployError> {
        let paths = &self.ctx.paths;
        let steps = paths.agent_install_steps();
        let outcome = ensure_installed(&self.remote, &paths.agent_binary, &steps)
            .await
            .during(Step::InstallAgent)?;

        let status = match outcome {
            InstallOutcome::Installed => StepStatus::Changed,
            InstallOutcome::AlreadyPresent => StepStatus::Unchanged,
        };
        self.report.record(Step::InstallAgent, status, None);
        Ok(self.advance(PuppetInstalled))
    }
}

// =============================================================================
// PuppetInstalled -> ModuleUpdated -> ModuleApplied
// =============================================================================

impl<'r> Deployment<'r, PuppetInstalled> {
    /// Clone the module repository, or pull it if the checkout is clean.
    pub async fn update_module(mut self) -> Result<Deployment<'r, ModuleUpdated>, DeployError> {
        let paths = &self.ctx.paths;
        let outcome = ensure_repo_current(&self.remote, &paths.module_dir(), &paths.repo_url)
            .await
            .during(Step::UpdateModule)?;

        let (status, detail) = match outcome {
            RepoOutcome::Cloned => (StepStatus::Changed, "cloned"),
            RepoOutcome::Updated => (StepStatus::Changed, "pulled"),
            RepoOutcome::LeftUntouched => (StepStatus::Unchanged, "local changes, not pulled"),
        };
        self.report
            .record(Step::UpdateModule, status, Some(detail.to_string()));
        Ok(self.advance(ModuleUpdated))
    }
}

impl<'r> Deployment<'r, ModuleUpdated> {
    /// Apply the module with the truthy properties and this host's name.
    pub async fn apply_module(mut self) -> Result<Deployment<'r, ModuleApplied>, DeployError> {
        let params = self.ctx.module_params();
        module::apply(&self.remote, &self.ctx.paths.module_name, &params)
            .await
            .map_err(|source| DeployError::Apply {
                step: Step::ApplyModule,
                source,
            })?;

        self.report.record(Step::ApplyModule, StepStatus::Changed, None);
        Ok(self.advance(ModuleApplied))
    }
}

// =============================================================================
// ModuleApplied -> DatabaseReady -> Replicated
// =============================================================================

impl<'r> Deployment<'r, ModuleApplied> {
    /// Wait for the database, then run the setup script.
    pub async fn setup_database(mut self) -> Result<Deployment<'r, DatabaseReady>, DeployError> {
        let readiness = wait_until_ready(&self.remote, &self.ctx.settle)
            .await
            .during(Step::SetupDatabase)?;

        let options = &self.ctx.options;
        maintenance::flush_database(
            &self.remote,
            &self.ctx.paths,
            options.setup_database,
            options.flush_database,
        )
        .await
        .during(Step::SetupDatabase)?;

        self.report.record(
            Step::SetupDatabase,
            StepStatus::Changed,
            Some(readiness.describe()),
        );
        Ok(self.advance(DatabaseReady))
    }
}

impl<'r> Deployment<'r, DatabaseReady> {
    /// Replicate to the master when masterless or slave. Standalone skips.
    pub async fn replicate(mut self) -> Result<Deployment<'r, Replicated>, DeployError> {
        let cluster = &self.ctx.properties.cluster;
        let ran = maintenance::replicate_database(
            &self.remote,
            &self.ctx.paths,
            cluster.is_masterless(),
            cluster.is_slave(),
        )
        .await
        .during(Step::Replicate)?;

        let status = if ran {
            StepStatus::Changed
        } else {
            StepStatus::Skipped
        };
        self.report.record(Step::Replicate, status, None);
        Ok(self.advance(Replicated))
    }
}

// =============================================================================
// Replicated -> MonitoringConfigured -> BootConfigured -> Done
// =============================================================================

impl<'r> Deployment<'r, Replicated> {
    /// Set up monitoring when a license key was given.
    pub async fn configure_monitoring(
        mut self,
    ) -> Result<Deployment<'r, MonitoringConfigured>, DeployError> {
        match &self.ctx.options.monitoring {
            Some(monitoring) => {
                maintenance::configure_monitoring(&self.remote, monitoring)
                    .await
                    .during(Step::ConfigureMonitoring)?;
                self.report
                    .record(Step::ConfigureMonitoring, StepStatus::Changed, None);
            }
            None => {
                self.report
                    .record(Step::ConfigureMonitoring, StepStatus::Skipped, None);
            }
        }
        Ok(self.advance(MonitoringConfigured))
    }
}

impl<'r> Deployment<'r, MonitoringConfigured> {
    fn boot_commands(&self) -> BootCommands {
        let paths = &self.ctx.paths;
        BootCommands {
            module_dir: paths.module_dir(),
            settle: self.ctx.settle.fallback,
            replication: self
                .ctx
                .properties
                .cluster
                .is_masterless()
                .then(|| paths.replication_command()),
            monitoring: self
                .ctx
                .options
                .monitoring
                .is_some()
                .then(plugin_start_command),
        }
    }

    /// Amend the boot script once. Skipped when the marker already exists.
    pub async fn configure_boot(mut self) -> Result<Deployment<'r, BootConfigured>, DeployError> {
        let paths = &self.ctx.paths;
        if self
            .remote
            .path_exists(&paths.marker)
            .await
            .during(Step::ConfigureBoot)?
        {
            self.report.record(
                Step::ConfigureBoot,
                StepStatus::Skipped,
                Some("already deployed".to_string()),
            );
            return Ok(self.advance(BootConfigured));
        }

        let existing = self
            .remote
            .read_file_privileged(&paths.boot_script)
            .await
            .during(Step::ConfigureBoot)?;

        if let Some(existing) = &existing {
            self.remote
                .write_file_privileged(&paths.boot_backup(), existing)
                .await
                .during(Step::ConfigureBoot)?;
        }

        let amended = amend_boot_script(
            existing.as_deref().unwrap_or_default(),
            &self.boot_commands(),
        );
        self.remote
            .write_file_privileged(&paths.boot_script, &amended)
            .await
            .during(Step::ConfigureBoot)?;
        self.remote
            .run_privileged(&format!("chmod 755 {}", shell_quote(&paths.boot_script)))
            .await
            .during(Step::ConfigureBoot)?;

        self.report.record(Step::ConfigureBoot, StepStatus::Changed, None);
        Ok(self.advance(BootConfigured))
    }
}

impl Deployment<'_, BootConfigured> {
    /// Write the Deployment Marker if absent and return the report.
    pub async fn finish(mut self) -> Result<DeployReport, DeployError> {
        let marker = &self.ctx.paths.marker;
        if self.remote.path_exists(marker).await.during(Step::Finish)? {
            self.report.record(Step::Finish, StepStatus::Unchanged, None);
        } else {
            self.remote
                .write_file_privileged(marker, &marker_content())
                .await
                .during(Step::Finish)?;
            self.report.record(Step::Finish, StepStatus::Changed, None);
        }

        let done = self.advance(Done);
        Ok(done.report)
    }
}

fn marker_content() -> String {
    format!(
        "deployed by {} at {}\n",
        gethostname::gethostname().to_string_lossy(),
        Utc::now().to_rfc3339()
    )
}
