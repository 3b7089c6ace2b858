pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default config locations, in search order.
const DEFAULT_PATHS: [&str; 4] = [
    "./sharestream.toml",
    "./config.toml",
    "~/.config/sharestream/config.toml",
    "/etc/sharestream/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// First existing default config path, if any.
pub fn find_config_path() -> Option<PathBuf> {
    DEFAULT_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_config_path() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.local.enabled {
        if config.local.port == 0 {
            anyhow::bail!("Local server port cannot be 0");
        }
        if config.local.port == config.server.port {
            anyhow::bail!(
                "Local server port {} clashes with the gateway port",
                config.local.port
            );
        }
        if !config.local.root.exists() {
            tracing::warn!("Local root does not exist: {:?}", config.local.root);
        }
    }

    for root in &config.local.import_roots {
        if !root.exists() {
            tracing::warn!("Import root does not exist: {:?}", root);
        }
    }

    if config.storage.database.trim().is_empty() {
        anyhow::bail!("Storage database name cannot be empty");
    }

    match config.shares.backend {
        ShareBackendKind::Mounted => {
            if !config.shares.mount_template.contains("{share}") {
                anyhow::bail!("Share mount_template must contain a {{share}} placeholder");
            }
        }
        ShareBackendKind::Smb => {
            if !cfg!(feature = "smb") {
                anyhow::bail!(
                    "Share backend 'smb' needs a build with the `smb` feature enabled"
                );
            }
        }
    }

    if config.covers.enabled {
        match config.covers.provider {
            CoverProviderKind::Tmdb => {
                if config.covers.api_key.as_deref().unwrap_or("").is_empty() {
                    anyhow::bail!("Cover provider 'tmdb' is enabled but has no API key");
                }
            }
            CoverProviderKind::Service => {
                if config.covers.base_url.as_deref().unwrap_or("").is_empty() {
                    anyhow::bail!("Cover provider 'service' is enabled but has no base_url");
                }
            }
        }
        if config.covers.placeholder_poster.trim().is_empty() {
            anyhow::bail!("Cover placeholder_poster cannot be empty");
        }
    }

    Ok(())
}
