//! In-memory share backend.
//!
//! Serves files held in memory and records every handle it closes, so the
//! teardown order of a lease can be observed.

use std::collections::{BTreeMap, HashSet};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use sharestream_common::{Error, Result, ShareCredentials};
use tokio::io::{AsyncRead, ReadBuf};

use super::{DirEntry, RemoteFile, ShareConnector, ShareSession, ShareTransport, ShareTree};

/// A handle kind that was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closed {
    File,
    Share,
    Session,
    Transport,
}

type Files = BTreeMap<String, Arc<Vec<u8>>>;

#[derive(Default)]
struct Inner {
    shares: BTreeMap<String, Files>,
    unreadable: HashSet<(String, String)>,
    unreachable: HashSet<String>,
    credentials: Option<ShareCredentials>,
    skip_limit: Option<u64>,
}

#[derive(Clone, Default)]
pub struct MemoryShareConnector {
    inner: Arc<Mutex<Inner>>,
    closed: Arc<Mutex<Vec<Closed>>>,
    connects: Arc<AtomicUsize>,
}

impl MemoryShareConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `path` (share-relative, `/`-separated) in `share`.
    pub fn with_file(self, share: &str, path: &str, data: Vec<u8>) -> Self {
        self.inner
            .lock()
            .shares
            .entry(share.to_string())
            .or_default()
            .insert(path.trim_matches('/').to_string(), Arc::new(data));
        self
    }

    /// Add an empty share.
    pub fn with_share(self, share: &str) -> Self {
        self.inner.lock().shares.entry(share.to_string()).or_default();
        self
    }

    /// Make listing `dir` in `share` fail.
    pub fn with_unreadable_dir(self, share: &str, dir: &str) -> Self {
        self.inner
            .lock()
            .unreadable
            .insert((share.to_string(), dir.trim_matches('/').to_string()));
        self
    }

    /// Refuse transports to `host`.
    pub fn with_unreachable_host(self, host: &str) -> Self {
        self.inner.lock().unreachable.insert(host.to_string());
        self
    }

    /// Only accept these credentials. Any credentials are accepted otherwise.
    pub fn with_credentials(self, credentials: ShareCredentials) -> Self {
        self.inner.lock().credentials = Some(credentials);
        self
    }

    /// Cap how far a single skip may move.
    pub fn with_skip_limit(self, limit: u64) -> Self {
        self.inner.lock().skip_limit = Some(limit);
        self
    }

    /// Handles closed so far, in order.
    pub fn closed(&self) -> Vec<Closed> {
        self.closed.lock().clone()
    }

    /// Number of transports opened so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShareConnector for MemoryShareConnector {
    async fn connect(&self, host: &str, _port: u16) -> Result<Box<dyn ShareTransport>> {
        if self.inner.lock().unreachable.contains(host) {
            return Err(Error::remote(format!("host {} unreachable", host)));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransport {
            connector: self.clone(),
        }))
    }
}

struct MemoryTransport {
    connector: MemoryShareConnector,
}

#[async_trait]
impl ShareTransport for MemoryTransport {
    async fn authenticate(
        &mut self,
        credentials: &ShareCredentials,
    ) -> Result<Box<dyn ShareSession>> {
        let accepted = match &self.connector.inner.lock().credentials {
            Some(expected) => expected == credentials,
            None => true,
        };
        if !accepted {
            return Err(Error::remote("authentication failed"));
        }
        Ok(Box::new(MemorySession {
            connector: self.connector.clone(),
        }))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connector.closed.lock().push(Closed::Transport);
        Ok(())
    }
}

struct MemorySession {
    connector: MemoryShareConnector,
}

#[async_trait]
impl ShareSession for MemorySession {
    async fn list_shares(&mut self) -> Result<Vec<String>> {
        Ok(self.connector.inner.lock().shares.keys().cloned().collect())
    }

    async fn connect_share(&mut self, name: &str) -> Result<Box<dyn ShareTree>> {
        let inner = self.connector.inner.lock();
        let files = inner
            .shares
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("share {}", name)))?;
        let unreadable = inner
            .unreadable
            .iter()
            .filter(|(share, _)| share == name)
            .map(|(_, dir)| dir.clone())
            .collect();

        Ok(Box::new(MemoryTree {
            files,
            unreadable,
            skip_limit: inner.skip_limit,
            closed: self.connector.closed.clone(),
        }))
    }

    async fn logoff(&mut self) -> Result<()> {
        self.connector.closed.lock().push(Closed::Session);
        Ok(())
    }
}

struct MemoryTree {
    files: Files,
    unreadable: HashSet<String>,
    skip_limit: Option<u64>,
    closed: Arc<Mutex<Vec<Closed>>>,
}

#[async_trait]
impl ShareTree for MemoryTree {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = path.trim_matches('/');
        if self.unreadable.contains(dir) {
            return Err(Error::remote(format!("access denied: {}", dir)));
        }

        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        for file_path in self.files.keys() {
            let rest = if dir.is_empty() {
                Some(file_path.as_str())
            } else {
                file_path
                    .strip_prefix(dir)
                    .and_then(|r| r.strip_prefix('/'))
            };
            if let Some(rest) = rest {
                match rest.split_once('/') {
                    Some((child, _)) => children.insert(child.to_string(), true),
                    None => children.insert(rest.to_string(), false),
                };
            }
        }

        if children.is_empty() && !dir.is_empty() {
            return Err(Error::not_found(format!("directory {}", dir)));
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    async fn open_read(&self, path: &str) -> Result<Box<dyn RemoteFile>> {
        let data = self
            .files
            .get(path.trim_matches('/'))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("file {}", path)))?;

        Ok(Box::new(MemoryFile {
            data,
            pos: 0,
            skip_limit: self.skip_limit,
            closed: self.closed.clone(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.lock().push(Closed::Share);
        Ok(())
    }
}

struct MemoryFile {
    data: Arc<Vec<u8>>,
    pos: usize,
    skip_limit: Option<u64>,
    closed: Arc<Mutex<Vec<Closed>>>,
}

impl AsyncRead for MemoryFile {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let start = this.pos.min(this.data.len());
        let remaining = &this.data[start..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.pos = start + n;
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl RemoteFile for MemoryFile {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn skip(&mut self, n: u64) -> Result<u64> {
        let available = self.data.len().saturating_sub(self.pos) as u64;
        let step = n
            .min(available)
            .min(self.skip_limit.unwrap_or(u64::MAX));
        self.pos += step as usize;
        Ok(step)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.lock().push(Closed::File);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn tree(connector: &MemoryShareConnector, share: &str) -> Box<dyn ShareTree> {
        let mut transport = connector.connect("nas", 445).await.unwrap();
        let creds = ShareCredentials {
            username: "u".into(),
            password: "p".into(),
            domain: None,
        };
        let mut session = transport.authenticate(&creds).await.unwrap();
        session.connect_share(share).await.unwrap()
    }

    #[tokio::test]
    async fn test_list_dir_derives_directories() {
        let connector = MemoryShareConnector::new()
            .with_file("Media", "Shows/Foo/Season 1/a.mkv", vec![])
            .with_file("Media", "b.mp4", vec![]);
        let tree = tree(&connector, "Media").await;

        assert_eq!(
            tree.list_dir("").await.unwrap(),
            vec![DirEntry::dir("Shows"), DirEntry::file("b.mp4")]
        );
        assert_eq!(
            tree.list_dir("/Shows/Foo").await.unwrap(),
            vec![DirEntry::dir("Season 1")]
        );
        assert!(tree.list_dir("Nope").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_share() {
        let connector = MemoryShareConnector::new().with_share("Media");
        let mut transport = connector.connect("nas", 445).await.unwrap();
        let creds = ShareCredentials {
            username: "u".into(),
            password: "p".into(),
            domain: None,
        };
        let mut session = transport.authenticate(&creds).await.unwrap();
        assert_eq!(session.list_shares().await.unwrap(), vec!["Media"]);
        assert!(matches!(
            session.connect_share("Other").await,
            Err(Error::NotFound(_))
        ));
    }
}
