//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a vault with a
//! fresh key and an in-memory share connector. The [`TestHarness::serve`]
//! method starts the gateway on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sharestream::config::CoversConfig;
use sharestream::gateway::{self, GatewayState, LocalState};
use sharestream::import::{LocalImporter, ShareImporter};
use sharestream::playlists::PlaylistRepository;
use sharestream::share::memory::Closed;
use sharestream::share::MemoryShareConnector;
use sharestream::vault::{CredentialVault, VaultKey};
use sharestream_common::{ServerEndpoint, ServerId, ShareCredentials};
use sharestream_db::pool::{init_memory_pool, DbPool};

pub const GATEWAY_PORT: u16 = 8989;
pub const LOCAL_PORT: u16 = 8990;

pub fn credentials() -> ShareCredentials {
    ShareCredentials {
        username: "alice".into(),
        password: "secret".into(),
        domain: None,
    }
}

pub struct TestHarness {
    pub db: DbPool,
    pub vault: Arc<CredentialVault>,
    pub connector: MemoryShareConnector,
    pub repository: PlaylistRepository,
}

impl TestHarness {
    pub fn new(connector: MemoryShareConnector) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let vault = Arc::new(CredentialVault::new(db.clone(), VaultKey::generate()));
        let repository = PlaylistRepository::new(db.clone());
        Self {
            db,
            vault,
            connector,
            repository,
        }
    }

    /// Save credentials for `host:445` and return its server id.
    pub fn save_server(&self, host: &str) -> ServerId {
        let endpoint = ServerEndpoint::new(host, 445);
        let id = endpoint.server_id();
        self.vault
            .save(&id, &endpoint, &credentials())
            .expect("failed to save credentials");
        id
    }

    pub fn gateway_state(&self) -> GatewayState {
        GatewayState {
            vault: self.vault.clone(),
            connector: Arc::new(self.connector.clone()),
        }
    }

    /// Start the gateway on a random port and return its address.
    pub async fn serve(&self) -> SocketAddr {
        spawn_router(gateway::router(self.gateway_state())).await
    }

    pub fn share_importer(&self) -> ShareImporter {
        ShareImporter {
            vault: self.vault.clone(),
            connector: Arc::new(self.connector.clone()),
            repository: self.repository.clone(),
            covers: CoversConfig::default(),
            gateway_port: GATEWAY_PORT,
        }
    }

    pub fn local_importer(&self) -> LocalImporter {
        LocalImporter {
            repository: self.repository.clone(),
            covers: CoversConfig::default(),
            local_port: LOCAL_PORT,
        }
    }

    /// Wait until the connector has recorded `expected` closes.
    pub async fn wait_for_closed(&self, expected: usize) -> Vec<Closed> {
        for _ in 0..100 {
            let closed = self.connector.closed();
            if closed.len() >= expected {
                return closed;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.connector.closed()
    }
}

/// Start the local file server for `root` on a random port.
pub async fn serve_local(root: &Path) -> SocketAddr {
    spawn_router(gateway::local_router(LocalState::new(root))).await
}

async fn spawn_router(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind random port");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}
