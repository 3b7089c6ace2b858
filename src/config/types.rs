use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub shares: SharesConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub covers: CoversConfig,
}

impl Config {
    /// Data directory with `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        expand(&self.storage.data_dir)
    }

    /// Full path of the SQLite database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.database)
    }

    /// Path of the vault key file. Defaults to `<data_dir>/vault.key`.
    pub fn vault_key_path(&self) -> PathBuf {
        match &self.vault.key_file {
            Some(path) => expand(path),
            None => self.data_dir().join("vault.key"),
        }
    }
}

fn expand(path: &std::path::Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Loopback streaming gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8989
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Companion local-file server and local import roots.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_local_port")]
    pub port: u16,

    /// Files outside this directory are never served.
    #[serde(default = "default_local_root")]
    pub root: PathBuf,

    /// Directories walked by `import local` when none are given.
    #[serde(default)]
    pub import_roots: Vec<PathBuf>,
}

fn default_true() -> bool {
    true
}
fn default_local_port() -> u16 {
    8990
}
fn default_local_root() -> PathBuf {
    PathBuf::from("/")
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_local_port(),
            root: default_local_root(),
            import_roots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file name, relative to `data_dir`.
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.local/share/sharestream")
}
fn default_database() -> String {
    "sharestream.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

/// Which share backend reaches remote servers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareBackendKind {
    /// Read through shares the OS has already mounted. Cannot verify
    /// credentials.
    #[default]
    Mounted,
    /// Speak SMB directly through libsmbclient (`smb` feature).
    Smb,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SharesConfig {
    #[serde(default)]
    pub backend: ShareBackendKind,

    /// Where a share is mounted locally. `{host}`, `{port}` and `{share}`
    /// are substituted.
    #[serde(default = "default_mount_template")]
    pub mount_template: String,

    /// Workgroup used by the SMB backend when a login has no domain.
    #[serde(default = "default_workgroup")]
    pub workgroup: String,
}

fn default_mount_template() -> String {
    "/run/user/1000/gvfs/smb-share:server={host},share={share}".to_string()
}

fn default_workgroup() -> String {
    "WORKGROUP".to_string()
}

impl Default for SharesConfig {
    fn default() -> Self {
        Self {
            backend: ShareBackendKind::default(),
            mount_template: default_mount_template(),
            workgroup: default_workgroup(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_service_type")]
    pub service_type: String,

    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,
}

fn default_service_type() -> String {
    "_smb._tcp.local".to_string()
}
fn default_discovery_timeout() -> u64 {
    5
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: default_service_type(),
            timeout_secs: default_discovery_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverProviderKind {
    #[default]
    Tmdb,
    Service,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoversConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub provider: CoverProviderKind,

    /// Override for the provider endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    /// Poster used when no cover is found.
    #[serde(default = "default_placeholder")]
    pub placeholder_poster: String,

    #[serde(default = "default_cover_timeout")]
    pub timeout_secs: u64,
}

fn default_language() -> String {
    "en-US".to_string()
}
fn default_placeholder() -> String {
    "https://via.placeholder.com/300x450.png?text=No+Cover".to_string()
}
fn default_cover_timeout() -> u64 {
    10
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: CoverProviderKind::default(),
            base_url: None,
            api_key: None,
            language: default_language(),
            placeholder_poster: default_placeholder(),
            timeout_secs: default_cover_timeout(),
        }
    }
}
