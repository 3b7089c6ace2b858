//! Encrypted credential vault.
//!
//! Every stored value (credentials, last server, last share per server) is
//! sealed with the [`VaultKey`] before it reaches SQLite. Rows that fail to
//! open are treated as absent.

mod crypto;

pub use crypto::VaultKey;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sharestream_common::{Error, Result, ServerEndpoint, ServerId, ShareCredentials};
use sharestream_db::pool::{get_conn, DbPool};
use sharestream_db::queries::vault as queries;

const LAST_SERVER_KEY: &str = "last_server_id";

fn last_share_key(id: &ServerId) -> String {
    format!("last_share:{}", id)
}

/// A server endpoint together with its login material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredServer {
    pub endpoint: ServerEndpoint,
    pub credentials: ShareCredentials,
}

/// Snapshot of the vault without secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultSummary {
    pub known_server_ids: Vec<ServerId>,
    pub last_server_id: Option<ServerId>,
    pub last_shares: Vec<(ServerId, String)>,
}

pub struct CredentialVault {
    pool: DbPool,
    key: VaultKey,
    writes: Mutex<()>,
}

impl CredentialVault {
    pub fn new(pool: DbPool, key: VaultKey) -> Self {
        Self {
            pool,
            key,
            writes: Mutex::new(()),
        }
    }

    /// Store credentials for `id`, registering it as known and as the last
    /// used server in one transaction.
    pub fn save(
        &self,
        id: &ServerId,
        endpoint: &ServerEndpoint,
        credentials: &ShareCredentials,
    ) -> Result<()> {
        let record = StoredServer {
            endpoint: endpoint.clone(),
            credentials: credentials.clone(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| Error::internal(format!("failed to encode credentials: {}", e)))?;
        let payload = self.key.seal_str(&json)?;
        let last = self.key.seal_str(id.as_str())?;

        let _guard = self.writes.lock();
        let conn = get_conn(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;
        queries::put_entry(&tx, id.as_str(), &payload)?;
        queries::put_meta(&tx, LAST_SERVER_KEY, &last)?;
        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!(server_id = %id, endpoint = %endpoint, "Saved credentials");
        Ok(())
    }

    /// Credentials for `id`, or `None` if unknown or unreadable.
    pub fn load(&self, id: &ServerId) -> Result<Option<StoredServer>> {
        let conn = get_conn(&self.pool)?;
        let Some(row) = queries::get_entry(&conn, id.as_str())? else {
            return Ok(None);
        };

        let decoded = self
            .key
            .open_str(&row.payload)
            .and_then(|json| {
                serde_json::from_str::<StoredServer>(&json)
                    .map_err(|e| Error::crypto(format!("invalid credential record: {}", e)))
            });

        match decoded {
            Ok(server) => Ok(Some(server)),
            Err(e) => {
                tracing::warn!(server_id = %id, "Ignoring unreadable vault entry: {}", e);
                Ok(None)
            }
        }
    }

    /// Remove every credential and metadata value. Returns the number of
    /// servers forgotten.
    pub fn clear_all(&self) -> Result<usize> {
        let _guard = self.writes.lock();
        let conn = get_conn(&self.pool)?;
        let removed = queries::clear(&conn)?;
        tracing::info!("Cleared {} vault entries", removed);
        Ok(removed)
    }

    pub fn list_known_server_ids(&self) -> Result<Vec<ServerId>> {
        let conn = get_conn(&self.pool)?;
        Ok(queries::list_server_ids(&conn)?
            .iter()
            .filter_map(|raw| ServerId::parse(raw))
            .collect())
    }

    /// Remember `share` as the last share used on `id`, and `id` as the last
    /// server.
    pub fn save_last_share(&self, id: &ServerId, share: &str) -> Result<()> {
        let share_value = self.key.seal_str(share)?;
        let server_value = self.key.seal_str(id.as_str())?;

        let _guard = self.writes.lock();
        let conn = get_conn(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;
        queries::put_meta(&tx, &last_share_key(id), &share_value)?;
        queries::put_meta(&tx, LAST_SERVER_KEY, &server_value)?;
        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(())
    }

    /// Last share used on `id`, or on the last used server when `id` is
    /// `None`.
    pub fn get_last_share(&self, id: Option<&ServerId>) -> Result<Option<String>> {
        let id = match id {
            Some(id) => id.clone(),
            None => match self.last_server_id()? {
                Some(id) => id,
                None => return Ok(None),
            },
        };
        self.read_meta(&last_share_key(&id))
    }

    pub fn last_server_id(&self) -> Result<Option<ServerId>> {
        Ok(self
            .read_meta(LAST_SERVER_KEY)?
            .and_then(|raw| ServerId::parse(&raw)))
    }

    /// Everything `/debug` may show.
    pub fn summary(&self) -> Result<VaultSummary> {
        let known_server_ids = self.list_known_server_ids()?;
        let mut last_shares = Vec::new();
        for id in &known_server_ids {
            if let Some(share) = self.get_last_share(Some(id))? {
                last_shares.push((id.clone(), share));
            }
        }
        Ok(VaultSummary {
            last_server_id: self.last_server_id()?,
            known_server_ids,
            last_shares,
        })
    }

    fn read_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = get_conn(&self.pool)?;
        let Some(sealed) = queries::get_meta(&conn, key)? else {
            return Ok(None);
        };
        match self.key.open_str(&sealed) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, "Ignoring unreadable vault value: {}", e);
                Ok(None)
            }
        }
    }
}
