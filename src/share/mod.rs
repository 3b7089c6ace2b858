//! Remote share access.
//!
//! A share server is reached in four stages, each yielding the handle for
//! the next: transport, authenticated session, connected share (tree) and
//! open file. Backends implement the traits below; [`ShareLease`] owns the
//! handles of one request and tears them down in reverse order.

mod lease;
pub mod memory;
pub mod mounted;
#[cfg(feature = "smb")]
pub mod smb;

pub use lease::ShareLease;
pub use memory::MemoryShareConnector;
pub use mounted::MountedShareConnector;
#[cfg(feature = "smb")]
pub use smb::SmbShareConnector;

use std::sync::Arc;

use async_trait::async_trait;
use sharestream_common::{Result, ShareCredentials};
use tokio::io::AsyncRead;

use crate::config::{ShareBackendKind, SharesConfig};

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Entry point of a share backend.
#[async_trait]
pub trait ShareConnector: Send + Sync {
    /// Open a transport to `host:port`.
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ShareTransport>>;

    /// Whether [`ShareTransport::authenticate`] actually checks the
    /// credentials with the server.
    fn verifies_credentials(&self) -> bool {
        true
    }
}

/// Build the connector selected by `[shares] backend`.
pub fn connector_from_config(config: &SharesConfig) -> Result<Arc<dyn ShareConnector>> {
    match config.backend {
        ShareBackendKind::Mounted => Ok(Arc::new(MountedShareConnector::new(
            config.mount_template.clone(),
        ))),
        #[cfg(feature = "smb")]
        ShareBackendKind::Smb => Ok(Arc::new(SmbShareConnector::new(config.workgroup.clone()))),
        #[cfg(not(feature = "smb"))]
        ShareBackendKind::Smb => Err(sharestream_common::Error::invalid_input(
            "share backend 'smb' is not available in this build (enable the `smb` feature)",
        )),
    }
}

#[async_trait]
pub trait ShareTransport: Send {
    async fn authenticate(
        &mut self,
        credentials: &ShareCredentials,
    ) -> Result<Box<dyn ShareSession>>;

    async fn disconnect(&mut self) -> Result<()>;
}

#[async_trait]
pub trait ShareSession: Send {
    /// Names of the shares visible to this session.
    async fn list_shares(&mut self) -> Result<Vec<String>>;

    async fn connect_share(&mut self, name: &str) -> Result<Box<dyn ShareTree>>;

    async fn logoff(&mut self) -> Result<()>;
}

/// A connected share. Paths are relative to the share root and use `/`.
#[async_trait]
pub trait ShareTree: Send + Sync {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Open a file read-only, allowing concurrent readers.
    async fn open_read(&self, path: &str) -> Result<Box<dyn RemoteFile>>;

    async fn close(&mut self) -> Result<()>;
}

/// An open remote file, read sequentially.
#[async_trait]
pub trait RemoteFile: AsyncRead + Send + Unpin {
    fn size(&self) -> u64;

    /// Advance by up to `n` bytes without returning them. Returns how far
    /// the position actually moved.
    async fn skip(&mut self, n: u64) -> Result<u64>;

    async fn close(&mut self) -> Result<()>;
}

/// Join share-relative path segments.
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
