//! Writing configuration files.

use super::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Write `config` as TOML, creating parent directories as needed.
///
/// Refuses to replace an existing file unless `overwrite` is set.
pub fn save_config(path: &Path, config: &Config, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        anyhow::bail!("Config file already exists: {:?}", path);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
    }

    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cinedex.toml");

        let mut config = Config::default();
        config.database.url = "https://demo-default-rtdb.firebaseio.com".to_string();
        save_config(&path, &config, false).unwrap();

        let loaded = super::super::load_config(&path).unwrap();
        assert_eq!(loaded.database.url, config.database.url);
        assert_eq!(loaded.database.collection, "movies");
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cinedex.toml");
        save_config(&path, &Config::default(), false).unwrap();
        assert!(save_config(&path, &Config::default(), false).is_err());
        save_config(&path, &Config::default(), true).unwrap();
    }
}
