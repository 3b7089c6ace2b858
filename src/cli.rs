use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sharestream")]
#[command(author, version, about = "Stream network-share video libraries to a local player")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming gateway and the local file server
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Gateway port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Browse the local network for file servers
    Discover {
        /// Seconds to wait for announcements
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Test a login and save it on success
    Login {
        /// Server host name or address
        host: String,

        /// Server port
        #[arg(long, default_value = "445")]
        port: u16,

        /// User name
        #[arg(short, long)]
        user: String,

        /// Password
        #[arg(long, env = "SHARESTREAM_PASSWORD", hide_env_values = true)]
        password: String,

        /// Domain or workgroup
        #[arg(long)]
        domain: Option<String>,

        /// Share to open; lists the server's shares when omitted
        #[arg(short, long)]
        share: Option<String>,

        /// Save the login even if the share backend cannot check the password
        #[arg(long)]
        no_verify: bool,
    },

    /// Import playlists from a share or from local folders
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },

    /// Manage stored playlists
    Playlists {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Inspect or reset saved credentials
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// Validate or write the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum ImportSource {
    /// Import from shares of a saved server
    Share {
        /// Server id as printed by `login`
        server_id: String,

        /// Shares to import; defaults to the last share used
        shares: Vec<String>,
    },

    /// Import from local folders
    Local {
        /// Folders to walk; defaults to the configured import roots
        roots: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum PlaylistAction {
    /// List playlist names and sizes
    List,

    /// Print a playlist as JSON
    Show { name: String },

    /// Remove a playlist
    Remove { name: String },

    /// Remove every playlist
    Clear,

    /// Combine playlists into a new one
    Merge {
        /// Playlists to combine, in order
        #[arg(required = true)]
        sources: Vec<String>,

        /// Shuffle the combined items
        #[arg(long)]
        shuffle: bool,

        /// Name of the new playlist
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum VaultAction {
    /// List known servers without secrets
    List,

    /// Forget every saved credential
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Write the effective configuration to a file
    Save {
        /// Destination path
        path: PathBuf,
    },
}
