// ABOUTME: SSH session to a database host using russh.
// ABOUTME: Key-file or agent login, TOFU host keys, and retried connects while a host boots.

use super::error::{Error, Result};
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

const DEFAULT_KEYS: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];

/// Where and how to log in.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Private key file. Without one the agent is tried, then `~/.ssh` defaults.
    pub key_path: Option<PathBuf>,
    /// Accept and record host keys that are not in known_hosts yet.
    /// A freshly launched instance is never known, so provisioning needs this.
    pub trust_on_first_use: bool,
    /// Overrides `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
    /// Per-command limit. Package installs and puppet runs are slow.
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(600),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }
}

/// What a remote command left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Host key policy handed to russh.
pub(crate) struct HostKeyPolicy {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl HostKeyPolicy {
    fn from_config(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    fn remember(&self, key: &ssh_key::PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!("could not record host key for {}: {}", self.host, e);
        }
    }
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        Ok(match known {
            Ok(true) => true,
            // A changed key is refused even with TOFU.
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!("host key for {}:{} has changed", self.host, self.port);
                false
            }
            Ok(false) | Err(_) if self.trust_on_first_use => {
                tracing::warn!("trusting new host key for {}:{}", self.host, self.port);
                self.remember(server_public_key);
                true
            }
            Ok(false) | Err(_) => false,
        })
    }
}

enum Credentials {
    Agent(AgentClient<UnixStream>),
    Key(Arc<ssh_key::PrivateKey>),
}

impl Credentials {
    async fn resolve(config: &SessionConfig) -> Result<Self> {
        if let Some(path) = &config.key_path {
            return Ok(Credentials::Key(Arc::new(load_key(path)?)));
        }

        if let Ok(agent) = AgentClient::connect_env().await {
            return Ok(Credentials::Agent(agent));
        }

        let home = std::env::var_os("HOME").ok_or_else(|| {
            Error::AgentUnavailable("no SSH agent and HOME is not set".to_string())
        })?;
        DEFAULT_KEYS
            .iter()
            .find_map(|name| load_key(&Path::new(&home).join(".ssh").join(name)).ok())
            .map(|key| Credentials::Key(Arc::new(key)))
            .ok_or_else(|| Error::AgentUnavailable("no SSH agent and no default keys".to_string()))
    }

    async fn login(self, handle: &mut Handle<HostKeyPolicy>, user: &str) -> Result<bool> {
        match self {
            Credentials::Key(key) => {
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                let result = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await?;
                Ok(result.success())
            }
            Credentials::Agent(mut agent) => {
                let identities = agent.request_identities().await.map_err(|e| {
                    Error::AgentUnavailable(format!("failed to list agent keys: {e}"))
                })?;
                for identity in identities {
                    let result = handle
                        .authenticate_publickey_with(user, identity, None, &mut agent)
                        .await;
                    if matches!(result, Ok(r) if r.success()) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

fn load_key(path: &Path) -> Result<ssh_key::PrivateKey> {
    load_secret_key(path, None).map_err(|e| Error::KeyLoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// An authenticated SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<HostKeyPolicy>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("user", &self.config.user)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connect and log in. One attempt; see [`connect_with_retry`].
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credentials = Credentials::resolve(&config).await?;

        let russh_config = Arc::new(Config {
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let mut handle = client::connect(
            russh_config,
            (config.host.as_str(), config.port),
            HostKeyPolicy::from_config(&config),
        )
        .await
        .map_err(|e| Error::Connection(format!("{}:{}: {}", config.host, config.port, e)))?;

        if !credentials.login(&mut handle, &config.user).await? {
            return Err(Error::AuthenticationFailed);
        }

        tracing::debug!("connected to {}@{}", config.user, config.host);
        Ok(Self { config, handle })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Run one command line, bounded by the configured timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        tracing::debug!(host = %self.config.host, "exec: {}", command);
        let timeout = self.config.command_timeout;
        tokio::time::timeout(timeout, self.collect(command))
            .await
            .map_err(|_| Error::CommandTimeout(timeout))?
    }

    async fn collect(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to open channel: {e}")))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {e}")))?;

        let mut output = (Vec::new(), Vec::new());
        let mut exit_code = None;
        let mut eof = false;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => output.0.extend_from_slice(&data),
                // ext 1 is stderr
                ChannelMsg::ExtendedData { data, ext: 1 } => output.1.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                ChannelMsg::Eof => eof = true,
                ChannelMsg::Close => break,
                _ => {}
            }
            if eof && exit_code.is_some() {
                break;
            }
        }

        Ok(CommandOutput {
            exit_code: exit_code.ok_or(Error::ChannelClosed)?,
            stdout: String::from_utf8_lossy(&output.0).into_owned(),
            stderr: String::from_utf8_lossy(&output.1).into_owned(),
        })
    }

    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// Connect to a host that may still be booting.
///
/// Transient failures are retried up to `attempts` times, `delay` apart.
/// Key and authentication errors fail at once.
pub async fn connect_with_retry(
    config: SessionConfig,
    attempts: u32,
    delay: Duration,
) -> Result<Session> {
    let attempts = attempts.max(1);
    let mut last = None;

    for attempt in 1..=attempts {
        match Session::connect(config.clone()).await {
            Ok(session) => return Ok(session),
            Err(e) if e.is_transient() => {
                tracing::info!(
                    "SSH to {} not ready (attempt {}/{}): {}",
                    config.host,
                    attempt,
                    attempts,
                    e
                );
                last = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::Unreachable {
        host: config.host,
        attempts,
        last: last.map(|e| e.to_string()).unwrap_or_default(),
    })
}
