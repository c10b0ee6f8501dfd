// ABOUTME: Library root for spandex - exposes the modules for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod cloud;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod module;
pub mod output;
pub mod properties;
pub mod remote;
pub mod ssh;
pub mod types;
pub mod workflow;
