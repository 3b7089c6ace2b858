//! Share backend speaking SMB through libsmbclient.
//!
//! A libsmbclient context is neither `Send` nor safe to share, so every
//! session and every connected share gets its own worker thread owning one
//! [`SmbClient`]. The async side sends commands over a channel and awaits
//! oneshot replies. Dropping the last sender ends the worker, which drops
//! the client and with it the server connection.
//!
//! libsmbclient authenticates lazily, so a worker lists the root of its
//! target before reporting ready. Wrong credentials fail there and surface
//! as [`Error::Remote`].

use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Read, Seek, SeekFrom};
use std::pin::Pin;
use std::sync::mpsc as std_mpsc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use pavao::{SmbClient, SmbCredentials, SmbDirentType, SmbFile, SmbOpenOptions, SmbOptions};
use sharestream_common::{Error, Result, ShareCredentials};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use super::{DirEntry, RemoteFile, ShareConnector, ShareSession, ShareTransport, ShareTree};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_CHUNK: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct SmbShareConnector {
    workgroup: String,
}

impl SmbShareConnector {
    pub fn new(workgroup: impl Into<String>) -> Self {
        Self {
            workgroup: workgroup.into(),
        }
    }
}

#[async_trait]
impl ShareConnector for SmbShareConnector {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ShareTransport>> {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(Error::remote(format!("cannot reach {}:{}: {}", host, port, e)))
            }
            Err(_) => {
                return Err(Error::remote(format!("timed out connecting to {}:{}", host, port)))
            }
        }

        Ok(Box::new(SmbTransport {
            server: server_url(host, port),
            workgroup: self.workgroup.clone(),
        }))
    }
}

/// `smb://host:port`, bracketing IPv6 literals.
fn server_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("smb://[{}]:{}", host, port)
    } else {
        format!("smb://{}:{}", host, port)
    }
}

/// Share-relative path in the form libsmbclient expects after the share.
fn remote_path(path: &str) -> Result<String> {
    let mut out = String::from("/");
    let mut first = true;
    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if part == ".." || part.contains('\\') {
            return Err(Error::Forbidden);
        }
        if !first {
            out.push('/');
        }
        out.push_str(part);
        first = false;
    }
    Ok(out)
}

fn check_share_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::invalid_input(format!("invalid share name: {:?}", name)));
    }
    Ok(())
}

/// Hidden administrative shares such as `C$` and `IPC$` are not offered.
fn is_listed_share(name: &str) -> bool {
    !name.is_empty() && !name.ends_with('$')
}

/// What a worker connects to.
#[derive(Clone)]
struct Target {
    server: String,
    share: Option<String>,
    username: String,
    password: String,
    workgroup: String,
}

impl Target {
    fn describe(&self) -> String {
        match &self.share {
            Some(share) => format!("{}/{}", self.server, share),
            None => self.server.clone(),
        }
    }

    fn credentials(&self) -> SmbCredentials {
        let share = self
            .share
            .as_ref()
            .map(|s| format!("/{}", s))
            .unwrap_or_default();
        SmbCredentials::default()
            .server(self.server.clone())
            .share(share)
            .username(self.username.clone())
            .password(self.password.clone())
            .workgroup(self.workgroup.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Share,
    Dir,
    File,
}

fn entry_kind(kind: SmbDirentType) -> Option<EntryKind> {
    match kind {
        SmbDirentType::FileShare => Some(EntryKind::Share),
        SmbDirentType::Dir => Some(EntryKind::Dir),
        SmbDirentType::File => Some(EntryKind::File),
        _ => None,
    }
}

enum Command {
    List {
        path: String,
        reply: oneshot::Sender<Result<Vec<(String, EntryKind)>>>,
    },
    Open {
        path: String,
        reply: oneshot::Sender<Result<(u64, u64)>>,
    },
    Read {
        id: u64,
        len: usize,
        reply: oneshot::Sender<io::Result<Vec<u8>>>,
    },
    Skip {
        id: u64,
        n: u64,
        reply: oneshot::Sender<Result<u64>>,
    },
    Close {
        id: u64,
    },
}

type Commands = std_mpsc::Sender<Command>;

fn worker_gone() -> Error {
    Error::remote("SMB connection closed")
}

/// Start a worker for `target` and wait until it has authenticated.
async fn start_worker(target: Target) -> Result<Commands> {
    let (commands, inbox) = std_mpsc::channel();
    let (ready_tx, ready_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("smb-worker".into())
        .spawn(move || run_worker(target, ready_tx, inbox))?;

    ready_rx.await.map_err(|_| worker_gone())??;
    Ok(commands)
}

async fn request<T>(
    commands: &Commands,
    make: impl FnOnce(oneshot::Sender<T>) -> Command,
) -> Result<T> {
    let (reply, response) = oneshot::channel();
    commands.send(make(reply)).map_err(|_| worker_gone())?;
    response.await.map_err(|_| worker_gone())
}

struct OpenFile<'a> {
    file: SmbFile<'a>,
    size: u64,
}

fn run_worker(
    target: Target,
    ready: oneshot::Sender<Result<()>>,
    inbox: std_mpsc::Receiver<Command>,
) {
    let client = match SmbClient::new(target.credentials(), SmbOptions::default()) {
        Ok(client) => client,
        Err(e) => {
            let _ = ready.send(Err(Error::remote(format!("SMB client setup failed: {}", e))));
            return;
        }
    };

    if let Err(e) = client.list_dir("/") {
        tracing::debug!("SMB login to {} rejected: {}", target.describe(), e);
        let _ = ready.send(Err(Error::remote(format!(
            "cannot open {} as {}: {}",
            target.describe(),
            target.username,
            e
        ))));
        return;
    }
    if ready.send(Ok(())).is_err() {
        return;
    }
    tracing::debug!("SMB worker ready for {}", target.describe());

    let mut files: HashMap<u64, OpenFile<'_>> = HashMap::new();
    let mut next_id = 0u64;

    while let Ok(command) = inbox.recv() {
        match command {
            Command::List { path, reply } => {
                let listed = client
                    .list_dir(&path)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|entry| {
                                entry_kind(entry.get_type())
                                    .map(|kind| (entry.name().to_string(), kind))
                            })
                            .collect()
                    })
                    .map_err(|e| Error::remote(format!("cannot list {}: {}", path, e)));
                let _ = reply.send(listed);
            }
            Command::Open { path, reply } => {
                let opened = client
                    .open_with(&path, SmbOpenOptions::default().read(true))
                    .map_err(|e| Error::not_found(format!("file {}: {}", path, e)))
                    .and_then(|mut file| {
                        let size = file.seek(SeekFrom::End(0))?;
                        file.seek(SeekFrom::Start(0))?;
                        Ok(OpenFile { file, size })
                    });
                let _ = reply.send(opened.map(|open| {
                    let id = next_id;
                    next_id += 1;
                    let size = open.size;
                    files.insert(id, open);
                    (id, size)
                }));
            }
            Command::Read { id, len, reply } => {
                let result = match files.get_mut(&id) {
                    Some(open) => {
                        let mut buf = vec![0u8; len];
                        open.file.read(&mut buf).map(|n| {
                            buf.truncate(n);
                            buf
                        })
                    }
                    None => Err(io::Error::new(io::ErrorKind::NotFound, "file is closed")),
                };
                let _ = reply.send(result);
            }
            Command::Skip { id, n, reply } => {
                let result = match files.get_mut(&id) {
                    Some(open) => skip_in(open, n),
                    None => Err(Error::not_found("file is closed")),
                };
                let _ = reply.send(result);
            }
            Command::Close { id } => {
                files.remove(&id);
            }
        }
    }

    drop(files);
    tracing::debug!("SMB worker for {} finished", target.describe());
}

fn skip_in(open: &mut OpenFile<'_>, n: u64) -> Result<u64> {
    let before = open.file.stream_position()?;
    let target = before.saturating_add(n).min(open.size.max(before));
    let after = open.file.seek(SeekFrom::Start(target))?;
    Ok(after.saturating_sub(before))
}

struct SmbTransport {
    server: String,
    workgroup: String,
}

#[async_trait]
impl ShareTransport for SmbTransport {
    async fn authenticate(
        &mut self,
        credentials: &ShareCredentials,
    ) -> Result<Box<dyn ShareSession>> {
        let target = Target {
            server: self.server.clone(),
            share: None,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            workgroup: credentials
                .domain
                .clone()
                .unwrap_or_else(|| self.workgroup.clone()),
        };
        let commands = start_worker(target.clone()).await?;
        Ok(Box::new(SmbSession {
            target,
            commands: Some(commands),
        }))
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

struct SmbSession {
    target: Target,
    commands: Option<Commands>,
}

#[async_trait]
impl ShareSession for SmbSession {
    async fn list_shares(&mut self) -> Result<Vec<String>> {
        let commands = self.commands.as_ref().ok_or_else(worker_gone)?;
        let entries = request(commands, |reply| Command::List {
            path: "/".into(),
            reply,
        })
        .await??;

        let mut shares: Vec<String> = entries
            .into_iter()
            .filter(|(name, kind)| *kind == EntryKind::Share && is_listed_share(name))
            .map(|(name, _)| name)
            .collect();
        shares.sort();
        Ok(shares)
    }

    async fn connect_share(&mut self, name: &str) -> Result<Box<dyn ShareTree>> {
        check_share_name(name)?;
        let target = Target {
            share: Some(name.to_string()),
            ..self.target.clone()
        };
        let commands = start_worker(target).await?;
        Ok(Box::new(SmbTree {
            commands: Some(commands),
        }))
    }

    async fn logoff(&mut self) -> Result<()> {
        self.commands = None;
        Ok(())
    }
}

struct SmbTree {
    commands: Option<Commands>,
}

impl SmbTree {
    fn commands(&self) -> Result<&Commands> {
        self.commands.as_ref().ok_or_else(worker_gone)
    }
}

#[async_trait]
impl ShareTree for SmbTree {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let path = remote_path(path)?;
        let entries = request(self.commands()?, |reply| Command::List { path, reply }).await??;

        let mut entries: Vec<DirEntry> = entries
            .into_iter()
            .filter(|(name, kind)| *kind != EntryKind::Share && name != "." && name != "..")
            .map(|(name, kind)| DirEntry {
                name,
                is_dir: kind == EntryKind::Dir,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn open_read(&self, path: &str) -> Result<Box<dyn RemoteFile>> {
        let path = remote_path(path)?;
        let commands = self.commands()?.clone();
        let (id, size) = request(&commands, |reply| Command::Open { path, reply }).await??;

        Ok(Box::new(SmbRemoteFile {
            id,
            size,
            commands: Some(commands),
            pending: None,
            buffered: Vec::new(),
            cursor: 0,
            eof: false,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.commands = None;
        Ok(())
    }
}

/// Reads one chunk at a time from the worker and hands it out through
/// [`AsyncRead`].
struct SmbRemoteFile {
    id: u64,
    size: u64,
    commands: Option<Commands>,
    pending: Option<oneshot::Receiver<io::Result<Vec<u8>>>>,
    buffered: Vec<u8>,
    cursor: usize,
    eof: bool,
}

fn closed_io() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "SMB connection closed")
}

impl AsyncRead for SmbRemoteFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if this.cursor < this.buffered.len() {
                let n = (this.buffered.len() - this.cursor).min(buf.remaining());
                buf.put_slice(&this.buffered[this.cursor..this.cursor + n]);
                this.cursor += n;
                return Poll::Ready(Ok(()));
            }
            if this.eof {
                return Poll::Ready(Ok(()));
            }

            if this.pending.is_none() {
                let Some(commands) = this.commands.as_ref() else {
                    return Poll::Ready(Err(closed_io()));
                };
                let (reply, response) = oneshot::channel();
                let command = Command::Read {
                    id: this.id,
                    len: READ_CHUNK,
                    reply,
                };
                if commands.send(command).is_err() {
                    return Poll::Ready(Err(closed_io()));
                }
                this.pending = Some(response);
            }

            let Some(pending) = this.pending.as_mut() else {
                continue;
            };
            let result = ready!(Pin::new(pending).poll(cx));
            this.pending = None;
            match result {
                Ok(Ok(data)) => {
                    this.eof = data.is_empty();
                    this.buffered = data;
                    this.cursor = 0;
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                Err(_) => return Poll::Ready(Err(closed_io())),
            }
        }
    }
}

#[async_trait]
impl RemoteFile for SmbRemoteFile {
    fn size(&self) -> u64 {
        self.size
    }

    async fn skip(&mut self, n: u64) -> Result<u64> {
        let from_buffer = (self.buffered.len() - self.cursor).min(n as usize);
        self.cursor += from_buffer;
        let rest = n - from_buffer as u64;
        if rest == 0 {
            return Ok(n);
        }

        let commands = self.commands.as_ref().ok_or_else(worker_gone)?;
        let id = self.id;
        let skipped = request(commands, |reply| Command::Skip { id, n: rest, reply }).await??;
        Ok(from_buffer as u64 + skipped)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Close { id: self.id });
        }
        self.pending = None;
        Ok(())
    }
}

impl Drop for SmbRemoteFile {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Close { id: self.id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url() {
        assert_eq!(server_url("192.168.1.10", 445), "smb://192.168.1.10:445");
        assert_eq!(server_url("nas.local", 1445), "smb://nas.local:1445");
        assert_eq!(server_url("fe80::1", 445), "smb://[fe80::1]:445");
    }

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("").unwrap(), "/");
        assert_eq!(remote_path("/").unwrap(), "/");
        assert_eq!(remote_path("Shows/Foo/a b.mkv").unwrap(), "/Shows/Foo/a b.mkv");
        assert_eq!(remote_path("./Movies//x.mkv").unwrap(), "/Movies/x.mkv");
        assert!(matches!(remote_path("Movies/../x.mkv"), Err(Error::Forbidden)));
        assert!(matches!(remote_path("Movies\\x.mkv"), Err(Error::Forbidden)));
    }

    #[test]
    fn test_share_names() {
        assert!(check_share_name("Media").is_ok());
        assert!(check_share_name("a/b").is_err());
        assert!(check_share_name("..").is_err());
        assert!(check_share_name("").is_err());

        assert!(is_listed_share("Media"));
        assert!(!is_listed_share("IPC$"));
        assert!(!is_listed_share("C$"));
    }

    #[test]
    fn test_entry_kinds() {
        assert_eq!(entry_kind(SmbDirentType::FileShare), Some(EntryKind::Share));
        assert_eq!(entry_kind(SmbDirentType::Dir), Some(EntryKind::Dir));
        assert_eq!(entry_kind(SmbDirentType::File), Some(EntryKind::File));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_remote_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = SmbShareConnector::new("WORKGROUP");
        assert!(matches!(
            connector.connect("127.0.0.1", port).await,
            Err(Error::Remote(_))
        ));
    }
}
