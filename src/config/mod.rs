pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./cinedex.toml",
        "~/.config/cinedex/config.toml",
        "/etc/cinedex/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Resolve where the session file lives.
pub fn session_path(config: &Config) -> PathBuf {
    match &config.auth.session_path {
        Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
        None => PathBuf::from(shellexpand::tilde("~/.config/cinedex/session.json").as_ref()),
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    // Validate database config
    let url = &config.database.url;
    if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
        anyhow::bail!("database.url must be an http(s) URL, got '{}'", url);
    }
    if url.starts_with("http://") {
        tracing::warn!("database.url is not encrypted: {}", url);
    }

    let collection = config.database.collection.trim_matches('/');
    if collection.is_empty() {
        anyhow::bail!("database.collection cannot be empty");
    }
    if cinedex_store::tree_path::segments(collection).is_err() {
        anyhow::bail!(
            "database.collection contains characters the store rejects: '{}'",
            collection
        );
    }

    if config.database.timeout_secs == 0 {
        anyhow::bail!("database.timeout_secs cannot be 0");
    }

    // Validate image host credentials
    let images = &config.images;
    let partially_set = !images.cloud_name.is_empty()
        || !images.api_key.is_empty()
        || !images.api_secret.is_empty();
    if partially_set && !images.is_configured() {
        anyhow::bail!("images requires cloud_name, api_key and api_secret together");
    }

    if images.timeout_secs == 0 {
        anyhow::bail!("images.timeout_secs cannot be 0");
    }

    if config.auth.api_key.is_empty() {
        tracing::warn!("auth.api_key is not set; sign-in will be unavailable");
    }

    Ok(())
}
