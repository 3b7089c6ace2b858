mod cli;

use sharestream::{
    config::{self, persist::save_config, Config},
    discovery::DiscoveryService,
    gateway::{self, GatewayState},
    import::{ImportHandle, LocalImporter, ShareImporter},
    login::{login, LoginOutcome, Verification},
    playlists::PlaylistRepository,
    share::{connector_from_config, ShareConnector},
    vault::{CredentialVault, VaultKey},
};
use sharestream_common::{ServerEndpoint, ServerId, ShareCredentials};
use sharestream_db::pool::init_pool;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction, ImportSource, PlaylistAction, VaultAction};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Long-lived objects shared by the commands.
struct Services {
    config: Config,
    repository: PlaylistRepository,
    vault: Arc<CredentialVault>,
    connector: Arc<dyn ShareConnector>,
}

impl Services {
    fn open(config: Config) -> Result<Self> {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = config.database_path();
        let db_path_str = db_path.to_string_lossy();
        tracing::debug!("Opening database at {}", db_path_str);
        let pool = init_pool(&db_path_str)?;

        let key = VaultKey::load_or_create(&config.vault_key_path())
            .context("Failed to load vault key")?;
        let vault = Arc::new(CredentialVault::new(pool.clone(), key));
        let connector = connector_from_config(&config.shares)?;

        Ok(Self {
            repository: PlaylistRepository::new(pool),
            vault,
            connector,
            config,
        })
    }

    fn share_importer(&self) -> ShareImporter {
        ShareImporter {
            vault: self.vault.clone(),
            connector: self.connector.clone(),
            repository: self.repository.clone(),
            covers: self.config.covers.clone(),
            gateway_port: self.config.server.port,
        }
    }

    fn local_importer(&self) -> LocalImporter {
        LocalImporter {
            repository: self.repository.clone(),
            covers: self.config.covers.clone(),
            local_port: self.config.local.port,
        }
    }
}

async fn start_servers(services: Services, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = services.config.clone();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Sharestream");

    let state = GatewayState {
        vault: services.vault.clone(),
        connector: services.connector.clone(),
    };

    if config.local.enabled {
        tokio::try_join!(
            gateway::start_gateway(&config, state),
            gateway::start_local_server(&config),
        )?;
    } else {
        gateway::start_gateway(&config, state).await?;
    }
    Ok(())
}

async fn discover(config: &Config, timeout: Option<u64>) -> Result<()> {
    let timeout = Duration::from_secs(timeout.unwrap_or(config.discovery.timeout_secs));
    println!("Browsing for file servers for {}s...", timeout.as_secs());

    let servers = DiscoveryService::new(config.discovery.service_type.clone())
        .discover(timeout)
        .await?;

    if servers.is_empty() {
        println!("No servers found. Enter the host manually with `sharestream login <host>`.");
        return Ok(());
    }

    for server in servers {
        println!(
            "{}  {:<24} {}:{}",
            server.id, server.display_name, server.host, server.port
        );
    }
    Ok(())
}

async fn login_command(
    services: &Services,
    endpoint: ServerEndpoint,
    credentials: ShareCredentials,
    share: Option<String>,
    verification: Verification,
) -> Result<()> {
    let outcome = login(
        services.connector.as_ref(),
        &services.vault,
        &endpoint,
        &credentials,
        share.as_deref(),
        verification,
    )
    .await
    .with_context(|| format!("Login to {} failed", endpoint))?;

    println!("Saved login for {} as {}", endpoint, outcome.server_id());
    match outcome {
        LoginOutcome::Shares { shares, .. } => {
            println!("\nShares:");
            for share in shares {
                println!("  {}", share);
            }
        }
        LoginOutcome::Share { share, entries, .. } => {
            println!("Share {} is readable ({} entries at its root)", share, entries);
        }
    }
    Ok(())
}

async fn wait_for_import(handle: ImportHandle) -> Result<()> {
    let added = handle
        .finish(|message| println!("{}", message))
        .await?;
    println!("\nImport complete: {} playlists added", added);
    Ok(())
}

async fn import(services: &Services, source: ImportSource) -> Result<()> {
    match source {
        ImportSource::Share { server_id, shares } => {
            let server_id = ServerId::parse(&server_id)
                .with_context(|| format!("Invalid server id: {}", server_id))?;
            wait_for_import(services.share_importer().start(server_id, shares)).await
        }
        ImportSource::Local { roots } => {
            let roots = if roots.is_empty() {
                services.config.local.import_roots.clone()
            } else {
                roots
            };
            wait_for_import(services.local_importer().start(roots)).await
        }
    }
}

fn playlists(repository: &PlaylistRepository, action: PlaylistAction) -> Result<()> {
    match action {
        PlaylistAction::List => {
            let playlists = repository.list();
            if playlists.is_empty() {
                println!("No playlists.");
            }
            for playlist in playlists {
                println!("{:<40} {} videos", playlist.file_name, playlist.videos.len());
            }
        }
        PlaylistAction::Show { name } => {
            let playlist = repository
                .get(&name)?
                .with_context(|| format!("No playlist named {}", name))?;
            println!("{}", serde_json::to_string_pretty(&playlist.videos)?);
        }
        PlaylistAction::Remove { name } => {
            if repository.remove(&name)? {
                println!("Removed {}", name);
            } else {
                println!("No playlist named {}", name);
            }
        }
        PlaylistAction::Clear => {
            let removed = repository.remove_all()?;
            println!("Removed {} playlists", removed);
        }
        PlaylistAction::Merge {
            sources,
            shuffle,
            name,
        } => {
            let merged = repository.merge(&sources, shuffle, name.as_deref())?;
            println!(
                "Created {} with {} videos",
                merged.file_name,
                merged.videos.len()
            );
        }
    }
    Ok(())
}

fn vault(vault: &CredentialVault, action: VaultAction) -> Result<()> {
    match action {
        VaultAction::List => {
            let summary = vault.summary()?;
            if summary.known_server_ids.is_empty() {
                println!("No saved servers.");
                return Ok(());
            }
            for id in &summary.known_server_ids {
                let marker = if summary.last_server_id.as_ref() == Some(id) {
                    "*"
                } else {
                    " "
                };
                let last_share = summary
                    .last_shares
                    .iter()
                    .find(|(server, _)| server == id)
                    .map(|(_, share)| share.as_str())
                    .unwrap_or("-");
                println!("{} {}  last share: {}", marker, id, last_share);
            }
        }
        VaultAction::Clear => {
            let removed = vault.clear_all()?;
            println!("Forgot {} servers", removed);
        }
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(path)?;
    config::validate_config(&config)?;

    println!("Configuration is valid!");
    println!("\nGateway: {}:{}", config.server.host, config.server.port);
    if config.local.enabled {
        println!("Local file server: port {} (root {:?})", config.local.port, config.local.root);
    }
    println!("Database: {:?}", config.database_path());
    println!("Share backend: {:?}", config.shares.backend);
    println!("Mount template: {}", config.shares.mount_template);
    if config.covers.enabled {
        println!("Covers: {:?}", config.covers.provider);
    } else {
        println!("Covers: disabled");
    }
    Ok(())
}

fn write_config(config_path: Option<&Path>, destination: &Path) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    save_config(destination, &config)?;
    println!("Wrote configuration to {:?}", destination);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "sharestream=trace,sharestream_parser=debug,sharestream_db=debug,sharestream_common=debug,tower_http=debug".to_string()
        } else {
            "sharestream=info,sharestream_db=warn,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Version => {
            println!("sharestream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { config: path } => {
                validate_config(path.as_deref().or(config_path))
            }
            ConfigAction::Save { path } => write_config(config_path, &path),
        },
        Commands::Discover { timeout } => {
            let config = config::load_config_or_default(config_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(discover(&config, timeout))
        }
        Commands::Start { host, port } => {
            let services = Services::open(config::load_config_or_default(config_path)?)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_servers(services, host, port))
        }
        Commands::Login {
            host,
            port,
            user,
            password,
            domain,
            share,
            no_verify,
        } => {
            let services = Services::open(config::load_config_or_default(config_path)?)?;
            let endpoint = ServerEndpoint::new(host, port);
            let credentials = ShareCredentials {
                username: user,
                password,
                domain,
            };
            let rt = tokio::runtime::Runtime::new()?;
            let verification = if no_verify {
                Verification::Skip
            } else {
                Verification::Required
            };
            rt.block_on(login_command(
                &services,
                endpoint,
                credentials,
                share,
                verification,
            ))
        }
        Commands::Import { source } => {
            let services = Services::open(config::load_config_or_default(config_path)?)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(import(&services, source))
        }
        Commands::Playlists { action } => {
            let services = Services::open(config::load_config_or_default(config_path)?)?;
            playlists(&services.repository, action)
        }
        Commands::Vault { action } => {
            let services = Services::open(config::load_config_or_default(config_path)?)?;
            vault(&services.vault, action)
        }
    }
}
