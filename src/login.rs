//! Server login: test a connection, then remember it.
//!
//! Nothing reaches the vault unless the whole check succeeds.

use sharestream_common::{Error, Result, ServerEndpoint, ServerId, ShareCredentials};

use crate::share::{ShareConnector, ShareLease};
use crate::vault::CredentialVault;

/// What a successful login found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials work; these shares are offered by the server.
    Shares {
        server_id: ServerId,
        shares: Vec<String>,
    },
    /// The requested share was opened and its root listed.
    Share {
        server_id: ServerId,
        share: String,
        entries: usize,
    },
}

impl LoginOutcome {
    pub fn server_id(&self) -> &ServerId {
        match self {
            Self::Shares { server_id, .. } | Self::Share { server_id, .. } => server_id,
        }
    }
}

/// What to do when the backend cannot check a password.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verification {
    /// Refuse to save credentials the backend cannot check.
    #[default]
    Required,
    /// Save them once the server and share are reachable.
    Skip,
}

/// Connect and authenticate against `endpoint`, then either list its shares
/// or open `share` and list its root. Credentials are saved only on
/// success; the share is remembered as the server's last share.
pub async fn login(
    connector: &dyn ShareConnector,
    vault: &CredentialVault,
    endpoint: &ServerEndpoint,
    credentials: &ShareCredentials,
    share: Option<&str>,
    verification: Verification,
) -> Result<LoginOutcome> {
    let server_id = endpoint.server_id();
    if !connector.verifies_credentials() {
        if verification == Verification::Required {
            return Err(Error::invalid_input(
                "this share backend cannot verify credentials; use `backend = \"smb\"` \
                 or pass --no-verify to save them unchecked",
            ));
        }
        tracing::warn!(server_id = %server_id, "Saving credentials the backend cannot verify");
    }
    tracing::info!(server_id = %server_id, "Testing login to {}", endpoint);

    let mut lease = ShareLease::authenticate(connector, endpoint, credentials).await?;

    let outcome = match share {
        None => {
            let shares = lease.list_shares().await?;
            LoginOutcome::Shares {
                server_id: server_id.clone(),
                shares,
            }
        }
        Some(share) => {
            lease.connect_share(share).await?;
            let listed = match lease.tree() {
                Some(tree) => tree.list_dir("").await,
                None => Ok(Vec::new()),
            };
            let entries = match listed {
                Ok(entries) => entries.len(),
                Err(e) => {
                    lease.release().await;
                    return Err(e);
                }
            };
            LoginOutcome::Share {
                server_id: server_id.clone(),
                share: share.to_string(),
                entries,
            }
        }
    };
    lease.release().await;

    vault.save(&server_id, endpoint, credentials)?;
    if let LoginOutcome::Share { share, .. } = &outcome {
        vault.save_last_share(&server_id, share)?;
    }

    tracing::info!(server_id = %server_id, "Login saved");
    Ok(outcome)
}
