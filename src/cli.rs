// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Global environment/config/output flags plus one subcommand per task.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use spandex::output::OutputMode;

#[derive(Parser)]
#[command(name = "spandex")]
#[command(about = "Provision EC2 instances and deploy CouchDB with a Puppet module")]
#[command(version)]
pub struct Cli {
    /// Environment: production, staging, development or local
    #[arg(short, long, global = true, env = "COUCHENV")]
    pub env: Option<String>,

    /// Configuration file to use instead of config/<environment>.json
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Options shared by every command that runs the deployment workflow.
#[derive(Args, Debug, Clone, Default)]
pub struct DeployArgs {
    /// Read provisioning properties from a YAML/JSON file instead of prompting
    #[arg(long, value_name = "FILE")]
    pub properties: Option<PathBuf>,

    /// Set up New Relic monitoring with this license key
    #[arg(long, value_name = "KEY")]
    pub monitoring_key: Option<String>,

    /// Do not pass -setup-database to the setup script
    #[arg(long)]
    pub skip_setup: bool,

    /// Do not pass -flush to the setup script
    #[arg(long)]
    pub skip_flush: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch one instance, optionally add it to a load balancer, and deploy CouchDB
    Provision {
        /// Instance name suffix (random 8 hex characters if omitted)
        #[arg(long)]
        suffix: Option<String>,

        /// Load balancer to register with (defaults to elb_name from the config)
        #[arg(long, value_name = "NAME")]
        load_balancer: Option<String>,

        /// Stop after launching; do not deploy
        #[arg(long)]
        no_deploy: bool,

        #[command(flatten)]
        deploy: DeployArgs,
    },

    /// Deploy CouchDB to an existing host
    Deploy {
        /// Host to deploy to
        #[arg(long)]
        host: String,

        #[command(flatten)]
        deploy: DeployArgs,
    },

    /// Run the database setup script (create and/or flush databases)
    FlushDatabase {
        #[arg(long)]
        host: String,

        /// Do not pass -setup-database
        #[arg(long)]
        skip_setup: bool,

        /// Do not pass -flush
        #[arg(long)]
        skip_flush: bool,
    },

    /// Replicate a masterless or slave node to its master
    ReplicateDatabase {
        #[arg(long)]
        host: String,

        #[arg(long, conflicts_with = "slave", required_unless_present = "slave")]
        masterless: bool,

        #[arg(long)]
        slave: bool,
    },

    /// Install and (re)start the New Relic agents
    ConfigureMonitoring {
        #[arg(long)]
        host: String,

        #[arg(long, value_name = "KEY")]
        license_key: String,
    },

    /// Write a template config/dev.json
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
