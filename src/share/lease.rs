use std::pin::Pin;
use std::task::{Context, Poll};

use sharestream_common::{Error, Result, ServerEndpoint, ShareCredentials};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::{RemoteFile, ShareConnector, ShareSession, ShareTransport, ShareTree};

const SKIP_CHUNK: usize = 64 * 1024;

#[derive(Default)]
struct Handles {
    file: Option<Box<dyn RemoteFile>>,
    tree: Option<Box<dyn ShareTree>>,
    session: Option<Box<dyn ShareSession>>,
    transport: Option<Box<dyn ShareTransport>>,
}

impl Handles {
    fn is_empty(&self) -> bool {
        self.file.is_none()
            && self.tree.is_none()
            && self.session.is_none()
            && self.transport.is_none()
    }

    /// Close file, share, session and transport in that order. Failures are
    /// logged and otherwise ignored.
    async fn release(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.close().await {
                tracing::debug!("Failed to close remote file: {}", e);
            }
        }
        if let Some(mut tree) = self.tree.take() {
            if let Err(e) = tree.close().await {
                tracing::debug!("Failed to close share: {}", e);
            }
        }
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.logoff().await {
                tracing::debug!("Failed to log off session: {}", e);
            }
        }
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.disconnect().await {
                tracing::debug!("Failed to disconnect transport: {}", e);
            }
        }
    }
}

/// Owner of every remote handle opened for one piece of work.
///
/// Handles are released exactly once: either by [`ShareLease::release`] or,
/// if the lease is dropped first (client went away, task aborted), by a
/// task spawned from `Drop`. A failing stage releases what was opened
/// before returning its error.
///
/// Once a file is open the lease reads from it through [`AsyncRead`].
#[derive(Default)]
pub struct ShareLease {
    handles: Handles,
}

impl ShareLease {
    /// Connect and authenticate.
    pub async fn authenticate(
        connector: &dyn ShareConnector,
        endpoint: &ServerEndpoint,
        credentials: &ShareCredentials,
    ) -> Result<Self> {
        let mut lease = Self::default();

        let mut transport = connector.connect(&endpoint.host, endpoint.port).await?;
        let session = transport.authenticate(credentials).await;
        lease.handles.transport = Some(transport);

        let session = lease.check(session).await?;
        lease.handles.session = Some(session);
        Ok(lease)
    }

    /// Connect, authenticate, open `share` and open `path` inside it.
    pub async fn open(
        connector: &dyn ShareConnector,
        endpoint: &ServerEndpoint,
        credentials: &ShareCredentials,
        share: &str,
        path: &str,
    ) -> Result<Self> {
        let mut lease = Self::authenticate(connector, endpoint, credentials).await?;
        lease.connect_share(share).await?;
        lease.open_file(path).await?;
        Ok(lease)
    }

    pub async fn list_shares(&mut self) -> Result<Vec<String>> {
        let result = match self.handles.session.as_mut() {
            Some(session) => session.list_shares().await,
            None => Err(Error::internal("no authenticated session")),
        };
        self.check(result).await
    }

    pub async fn connect_share(&mut self, share: &str) -> Result<()> {
        let result = match self.handles.session.as_mut() {
            Some(session) => session.connect_share(share).await,
            None => Err(Error::internal("no authenticated session")),
        };
        let tree = self.check(result).await?;
        self.handles.tree = Some(tree);
        Ok(())
    }

    pub async fn open_file(&mut self, path: &str) -> Result<()> {
        let result = match self.handles.tree.as_ref() {
            Some(tree) => tree.open_read(path).await,
            None => Err(Error::internal("no connected share")),
        };
        let file = self.check(result).await?;
        self.handles.file = Some(file);
        Ok(())
    }

    /// The connected share, if any.
    pub fn tree(&self) -> Option<&dyn ShareTree> {
        self.handles.tree.as_deref()
    }

    /// Size of the open file, or 0 when none is open.
    pub fn file_size(&self) -> u64 {
        self.handles.file.as_ref().map(|f| f.size()).unwrap_or(0)
    }

    /// Move the read position forward by exactly `n` bytes.
    ///
    /// Uses the backend's skip first and reads and discards whatever it
    /// left over. Returns an error if the file ends first.
    pub async fn skip_exact(&mut self, n: u64) -> Result<()> {
        let Some(file) = self.handles.file.as_mut() else {
            return Err(Error::internal("no open file"));
        };

        let mut remaining = n;
        if remaining > 0 {
            let skipped = file.skip(remaining).await?;
            remaining = remaining.saturating_sub(skipped);
        }

        if remaining > 0 {
            tracing::trace!(remaining, "Short skip, discarding by read");
            let mut scratch = vec![0u8; SKIP_CHUNK];
            while remaining > 0 {
                let want = remaining.min(SKIP_CHUNK as u64) as usize;
                let read = file.read(&mut scratch[..want]).await?;
                if read == 0 {
                    return Err(Error::internal(format!(
                        "file ended {} bytes before the requested offset",
                        remaining
                    )));
                }
                remaining -= read as u64;
            }
        }
        Ok(())
    }

    /// Close every handle now, in order.
    pub async fn release(mut self) {
        self.handles.release().await;
    }

    async fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.handles.release().await;
        }
        result
    }
}

impl AsyncRead for ShareLease {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut().handles.file.as_mut() {
            Some(file) => Pin::new(file).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl Drop for ShareLease {
    fn drop(&mut self) {
        let mut handles = std::mem::take(&mut self.handles);
        if handles.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { handles.release().await });
            }
            Err(_) => {
                tracing::warn!("Share lease dropped outside a runtime; handles not closed");
            }
        }
    }
}
