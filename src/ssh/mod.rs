// ABOUTME: SSH transport used to reach the host being deployed.
// ABOUTME: Key-file or agent authentication with known_hosts verification.

mod client;
mod error;

pub use client::{CommandOutput, Session, SessionConfig, connect_with_retry};
pub use error::{Error, Result};
