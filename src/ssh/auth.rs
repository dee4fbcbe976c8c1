//! Authentication method resolution
//!
//! Picks exactly one credential per connection attempt, in a fixed order:
//! configured password, then a running SSH agent, then the first unencrypted
//! default key file under `~/.ssh`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::client::Handle;
use russh::keys::agent::client::{AgentClient, AgentStream};
use russh::keys::{ssh_key, PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use russh::{AgentAuthError, CryptoVec, Signer};
use tracing::{debug, info};

use super::config::ConnectionConfig;
use super::handler::SshHandler;
use crate::error::{RemoteError, Result};

/// Key files tried in order, relative to `~/.ssh`
pub const DEFAULT_KEY_FILES: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];

type DynAgent = AgentClient<Box<dyn AgentStream + Send + Unpin + 'static>>;

/// The credential presented for one connection attempt
pub enum AuthMethod {
    Password(String),
    PublicKey(Arc<PrivateKey>),
    Agent {
        client: DynAgent,
        identities: Vec<PublicKey>,
    },
}

impl AuthMethod {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Password(_) => "password",
            AuthMethod::PublicKey(_) => "publickey",
            AuthMethod::Agent { .. } => "agent",
        }
    }

    /// Present this credential on `session`; true when the server accepted it
    pub(crate) async fn authenticate(
        self,
        session: &mut Handle<SshHandler>,
        username: &str,
    ) -> Result<bool> {
        match self {
            AuthMethod::Password(password) => {
                let result = session
                    .authenticate_password(username, password)
                    .await
                    .map_err(|e| RemoteError::connect(e.to_string()))?;
                Ok(result.success())
            }
            AuthMethod::PublicKey(key) => {
                let hash_alg = rsa_hash(session).await?;
                let result = session
                    .authenticate_publickey(username, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await
                    .map_err(|e| RemoteError::connect(e.to_string()))?;
                Ok(result.success())
            }
            AuthMethod::Agent {
                mut client,
                identities,
            } => {
                let server_rsa_hash = rsa_hash(session).await?;
                for key in identities {
                    let hash_alg = agent_hash_alg(&key, server_rsa_hash);
                    debug!("Trying agent key: {} ({})", key.algorithm().as_str(), key.comment());
                    let result = session
                        .authenticate_publickey_with(
                            username,
                            key,
                            hash_alg,
                            &mut AgentSigner {
                                agent: &mut client,
                            },
                        )
                        .await;
                    match result {
                        Ok(result) if result.success() => return Ok(true),
                        Ok(_) => continue,
                        Err(e) => debug!("Agent signing failed: {}", e),
                    }
                }
                Ok(false)
            }
        }
    }
}

/// Strongest RSA signature hash the server accepts (None: plain `ssh-rsa`)
async fn rsa_hash(session: &Handle<SshHandler>) -> Result<Option<ssh_key::HashAlg>> {
    Ok(session
        .best_supported_rsa_hash()
        .await
        .map_err(|e| RemoteError::connect(e.to_string()))?
        .flatten())
}

/// Hash algorithm to request for an agent key; only RSA keys take one
fn agent_hash_alg(
    key: &PublicKey,
    server_rsa_hash: Option<ssh_key::HashAlg>,
) -> Option<ssh_key::HashAlg> {
    if key.algorithm().is_rsa() {
        server_rsa_hash
    } else {
        None
    }
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Password(_) => f.write_str("Password(********)"),
            AuthMethod::PublicKey(key) => write!(f, "PublicKey({})", key.algorithm().as_str()),
            AuthMethod::Agent { identities, .. } => {
                write!(f, "Agent({} identities)", identities.len())
            }
        }
    }
}

/// Signs agent challenges with owned keys so the auth future stays `Send`
struct AgentSigner<'a> {
    agent: &'a mut DynAgent,
}

impl Signer for AgentSigner<'_> {
    type Error = AgentAuthError;

    fn auth_publickey_sign(
        &mut self,
        key: &ssh_key::PublicKey,
        hash_alg: Option<ssh_key::HashAlg>,
        to_sign: CryptoVec,
    ) -> impl Future<Output = std::result::Result<CryptoVec, Self::Error>> + Send {
        let key_owned = key.clone();
        async move {
            self.agent
                .sign_request(&key_owned, hash_alg, to_sign)
                .await
                .map_err(Into::into)
        }
    }
}

/// Decides which authentication material to present
#[derive(Debug, Clone)]
pub struct AuthResolver {
    /// Agent socket; None disables the agent step
    agent_socket: Option<PathBuf>,

    /// Home directory holding `.ssh`; None disables the key file step
    home: Option<PathBuf>,
}

impl Default for AuthResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AuthResolver {
    /// Resolver using `SSH_AUTH_SOCK` and the user's home directory
    pub fn from_env() -> Self {
        Self {
            agent_socket: std::env::var_os("SSH_AUTH_SOCK")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            home: dirs::home_dir(),
        }
    }

    /// Override the agent socket (None disables the agent)
    pub fn with_agent_socket(mut self, socket: Option<PathBuf>) -> Self {
        self.agent_socket = socket;
        self
    }

    /// Override the home directory searched for key files
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Produce exactly one authentication method for `config`
    pub async fn resolve(&self, config: &ConnectionConfig) -> Result<AuthMethod> {
        if let Some(password) = config.password() {
            debug!("Using password authentication for '{}'", config.username);
            return Ok(AuthMethod::Password(password.to_string()));
        }

        if let Some(method) = self.agent().await {
            return Ok(method);
        }

        if let Some(home) = &self.home {
            if let Some(key) = find_default_key(&home.join(".ssh")) {
                return Ok(AuthMethod::PublicKey(Arc::new(key)));
            }
        }

        Err(RemoteError::NoAuthAvailable)
    }

    #[cfg(unix)]
    async fn agent(&self) -> Option<AuthMethod> {
        let socket = self.agent_socket.as_ref()?;
        let mut client = match AgentClient::connect_uds(socket).await {
            Ok(client) => client.dynamic(),
            Err(e) => {
                debug!("SSH agent not available at {}: {}", socket.display(), e);
                return None;
            }
        };
        match client.request_identities().await {
            Ok(identities) if !identities.is_empty() => {
                info!("Using SSH agent with {} identities", identities.len());
                Some(AuthMethod::Agent { client, identities })
            }
            Ok(_) => {
                debug!("SSH agent has no identities loaded");
                None
            }
            Err(e) => {
                debug!("Failed to list agent identities: {}", e);
                None
            }
        }
    }

    #[cfg(not(unix))]
    async fn agent(&self) -> Option<AuthMethod> {
        None
    }
}

/// First parseable, unencrypted key among [`DEFAULT_KEY_FILES`] in `ssh_dir`
fn find_default_key(ssh_dir: &Path) -> Option<PrivateKey> {
    DEFAULT_KEY_FILES.iter().find_map(|name| {
        let path = ssh_dir.join(name);
        let content = std::fs::read_to_string(&path).ok()?;
        match PrivateKey::from_openssh(content.as_bytes()) {
            Ok(key) if key.is_encrypted() => {
                debug!("Skipping passphrase-protected key {}", path.display());
                None
            }
            Ok(key) => {
                info!("Using key file {}", path.display());
                Some(key)
            }
            Err(e) => {
                debug!("Skipping unparseable key {}: {}", path.display(), e);
                None
            }
        }
    })
}
