// ABOUTME: Command module aggregator for the spandex CLI.
// ABOUTME: Re-exports provision, deploy and maintenance command handlers.

mod deploy;
mod maintenance;
mod provision;
mod session;

pub use deploy::deploy;
pub use maintenance::{configure_monitoring, flush_database, replicate_database};
pub use provision::{ProvisionArgs, provision};
