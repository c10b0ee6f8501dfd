// ABOUTME: Waits for the database to answer before the setup script runs.
// ABOUTME: Polls a probe with capped exponential backoff, or sleeps a fallback interval.

use std::time::Duration;

use tokio::time::Instant;

use super::context::SettleConfig;
use crate::remote::{Remote, RemoteCommandError};

const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// How the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The probe succeeded after this many attempts.
    Ready { attempts: u32 },
    /// The probe never succeeded within the timeout.
    TimedOut { attempts: u32 },
    /// No probe configured; slept for the fallback interval.
    Slept(Duration),
}

impl Readiness {
    pub fn describe(&self) -> String {
        match self {
            Readiness::Ready { attempts } => format!("ready after {attempts} probe(s)"),
            Readiness::TimedOut { attempts } => {
                format!("not ready after {attempts} probe(s), continuing")
            }
            Readiness::Slept(d) => format!("slept {}s", d.as_secs()),
        }
    }
}

/// Wait until the database looks ready.
///
/// A timeout is not an error: the setup script that follows reports real
/// failures. Transport errors while probing are returned.
pub async fn wait_until_ready(
    remote: &Remote<'_>,
    settle: &SettleConfig,
) -> Result<Readiness, RemoteCommandError> {
    let Some(probe) = &settle.probe else {
        tracing::debug!("no readiness probe, sleeping {:?}", settle.fallback);
        tokio::time::sleep(settle.fallback).await;
        return Ok(Readiness::Slept(settle.fallback));
    };

    let command = probe.command();
    let started = Instant::now();
    let mut backoff = settle.initial_backoff.max(MIN_BACKOFF);
    let mut attempts = 0;

    loop {
        attempts += 1;
        if remote.run_unchecked(&command).await?.success() {
            return Ok(Readiness::Ready { attempts });
        }

        let elapsed = started.elapsed();
        if elapsed >= settle.timeout {
            tracing::warn!(
                "database not ready after {:?} ({} probe(s)); continuing",
                elapsed,
                attempts
            );
            return Ok(Readiness::TimedOut { attempts });
        }

        tokio::time::sleep(backoff.min(settle.timeout - elapsed)).await;
        backoff = (backoff * 2).min(settle.max_backoff).max(MIN_BACKOFF);
    }
}
