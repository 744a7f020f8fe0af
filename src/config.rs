//! Configuration loading and persistence.
//!
//! Reads connection settings from `<config_dir>/config.json` and layers
//! environment variables on top. The result is copied into
//! [`ClientOptions`] with [`Config::apply`]; options set in code after that
//! still win.
//!
//! # Environment Variables
//!
//! - `DEVLINK_CONFIG_DIR` - directory holding `config.json`
//! - `DEVLINK_HOST` - server host
//! - `DEVLINK_PORT` - server port
//! - `DEVLINK_SECURE` - `1`/`true` for `wss://`
//! - `DEVLINK_NAME` - client name shown by the server

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::options::{ClientOptions, DEFAULT_HOST, DEFAULT_PORT};

const CONFIG_FILE: &str = "config.json";

/// Connection settings for a devlink client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u32,
    /// Use `wss://`.
    pub secure: bool,
    /// Client name; the crate name when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            secure: false,
            name: None,
        }
    }
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// `DEVLINK_CONFIG_DIR` when set, otherwise the platform config dir
    /// (e.g. `~/.config/devlink`).
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("DEVLINK_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("devlink"))
    }

    /// Path of the config file inside [`Config::config_dir`].
    pub fn path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Loads the config file, falling back to defaults, then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&Self::path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads `path`, or defaults when it does not exist. No env overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Persists the config to `path`, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Persists the config to [`Config::path`] and returns where it went.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to_path(&path)?;
        log::info!("[Config] Saved {}", path.display());
        Ok(path)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DEVLINK_HOST") {
            self.host = host;
        }

        if let Some(port) = lookup("DEVLINK_PORT") {
            match port.parse::<u32>() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("[Config] Ignoring DEVLINK_PORT={}", port),
            }
        }

        if let Some(secure) = lookup("DEVLINK_SECURE") {
            self.secure = matches!(secure.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(name) = lookup("DEVLINK_NAME") {
            self.name = Some(name);
        }
    }

    /// Copy these settings into `options`.
    pub fn apply(&self, options: &mut ClientOptions) {
        options.host.clone_from(&self.host);
        options.port = self.port;
        options.secure = self.secure;
        if let Some(name) = &self.name {
            options.name.clone_from(name);
        }
    }
}
