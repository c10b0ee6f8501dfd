// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce the step order at compile time.

/// Connected, nothing done yet.
/// Available actions: `prepare_host()`, `install_agent()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Fresh;

/// Puppet agent present on the host.
/// Available actions: `update_module()`
#[derive(Debug, Clone, Copy, Default)]
pub struct PuppetInstalled;

/// Module checkout cloned or current.
/// Available actions: `apply_module()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleUpdated;

/// Module applied.
/// Available actions: `setup_database()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleApplied;

/// Databases created and/or flushed.
/// Available actions: `replicate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseReady;

/// Replication ran, or was not needed.
/// Available actions: `configure_monitoring()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Replicated;

/// Monitoring configured, or not requested.
/// Available actions: `configure_boot()`
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitoringConfigured;

/// Boot script amended, or already amended on an earlier run.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct BootConfigured;

/// Marker written.
#[derive(Debug, Clone, Copy, Default)]
pub struct Done;
