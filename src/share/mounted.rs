//! Share backend over locally mounted shares.
//!
//! The operating system (gvfs, autofs, `mount.cifs`) owns the network
//! session; this backend maps `host`/`share` onto the mount point described
//! by a template such as `/mnt/{host}/{share}` and reads files from there.
//!
//! The mount already carries its own credentials, so this backend cannot
//! tell a right password from a wrong one. It reports that through
//! [`ShareConnector::verifies_credentials`].

use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use sharestream_common::{Error, Result, ShareCredentials};
use tokio::io::{AsyncRead, AsyncSeekExt, ReadBuf};

use super::{DirEntry, RemoteFile, ShareConnector, ShareSession, ShareTransport, ShareTree};

#[derive(Debug, Clone)]
pub struct MountedShareConnector {
    template: String,
}

impl MountedShareConnector {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

/// Substitutes `{host}`, `{port}` and `{share}`.
fn render(template: &str, host: &str, port: u16, share: &str) -> String {
    template
        .replace("{host}", host)
        .replace("{port}", &port.to_string())
        .replace("{share}", share)
}

/// Where shares of one server live: the directory that holds the mount
/// points, and the prefix/suffix around the share name inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MountLayout {
    parent: PathBuf,
    prefix: String,
    suffix: String,
}

impl MountLayout {
    fn new(template: &str, host: &str, port: u16) -> Result<Self> {
        const MARKER: &str = "\u{0}share\u{0}";
        let rendered = render(template, host, port, MARKER);
        let path = Path::new(&rendered);

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| n.contains(MARKER))
            .ok_or_else(|| {
                Error::invalid_input("mount template must end with a component containing {share}")
            })?;
        let (prefix, suffix) = name
            .split_once(MARKER)
            .ok_or_else(|| Error::invalid_input("mount template has no {share}"))?;

        Ok(Self {
            parent: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    fn share_path(&self, share: &str) -> PathBuf {
        self.parent
            .join(format!("{}{}{}", self.prefix, share, self.suffix))
    }

    fn share_name<'a>(&self, entry: &'a str) -> Option<&'a str> {
        entry
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl ShareConnector for MountedShareConnector {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ShareTransport>> {
        let layout = MountLayout::new(&self.template, host, port)?;
        if !tokio::fs::try_exists(&layout.parent).await.unwrap_or(false) {
            return Err(Error::remote(format!(
                "no mounts for {}:{} under {:?}",
                host, port, layout.parent
            )));
        }
        Ok(Box::new(MountedTransport { layout }))
    }

    fn verifies_credentials(&self) -> bool {
        false
    }
}

struct MountedTransport {
    layout: MountLayout,
}

#[async_trait]
impl ShareTransport for MountedTransport {
    /// Does not check `credentials`; the OS mount is used as-is.
    async fn authenticate(
        &mut self,
        _credentials: &ShareCredentials,
    ) -> Result<Box<dyn ShareSession>> {
        Ok(Box::new(MountedSession {
            layout: self.layout.clone(),
        }))
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

struct MountedSession {
    layout: MountLayout,
}

#[async_trait]
impl ShareSession for MountedSession {
    async fn list_shares(&mut self) -> Result<Vec<String>> {
        let mut dir = tokio::fs::read_dir(&self.layout.parent)
            .await
            .map_err(|e| Error::remote(format!("cannot list shares: {}", e)))?;

        let mut shares = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(share) = self.layout.share_name(name) else { continue };
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                shares.push(share.to_string());
            }
        }
        shares.sort();
        Ok(shares)
    }

    async fn connect_share(&mut self, name: &str) -> Result<Box<dyn ShareTree>> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(Error::invalid_input(format!("invalid share name: {:?}", name)));
        }
        let root = self.layout.share_path(name);
        match tokio::fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => Ok(Box::new(MountedTree { root })),
            _ => Err(Error::not_found(format!("share {}", name))),
        }
    }

    async fn logoff(&mut self) -> Result<()> {
        Ok(())
    }
}

struct MountedTree {
    root: PathBuf,
}

impl MountedTree {
    /// Map a share-relative path into the mount, rejecting `..` and
    /// absolute components.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(Error::Forbidden),
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ShareTree for MountedTree {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.resolve(path)?;
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| Error::remote(format!("cannot read {:?}: {}", dir, e)))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks so linked folders are walked like real ones.
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            entries.push(DirEntry { name, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn open_read(&self, path: &str) -> Result<Box<dyn RemoteFile>> {
        let full = self.resolve(path)?;
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .open(&full)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::not_found(format!("file {}", path)),
                _ => Error::Io(e),
            })?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(Error::not_found(format!("file {}", path)));
        }

        Ok(Box::new(MountedFile {
            file,
            size: meta.len(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct MountedFile {
    file: tokio::fs::File,
    size: u64,
}

impl AsyncRead for MountedFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

#[async_trait]
impl RemoteFile for MountedFile {
    fn size(&self) -> u64 {
        self.size
    }

    async fn skip(&mut self, n: u64) -> Result<u64> {
        let before = self.file.stream_position().await?;
        let target = before.saturating_add(n).min(self.size.max(before));
        let after = self.file.seek(SeekFrom::Start(target)).await?;
        Ok(after.saturating_sub(before))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
