//! Configuration for the previewer bridge
//!
//! Loads configuration from TOML file at `~/.config/nemo/previewer.toml`.
//! A missing file is not an error: the NautilusPreviewer defaults apply.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dbus::{
    PREVIEWER_DBUS_EVENT, PREVIEWER_DBUS_IFACE, PREVIEWER_DBUS_NAME, PREVIEWER_DBUS_PATH,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
    pub previewer: Endpoint,
}

impl Config {
    /// Load configuration from the default location, or use defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, or use defaults if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nemo");

        Ok(config_dir.join("previewer.toml"))
    }

    /// Save default configuration to file
    pub fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Which bus to connect to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Explicit bus address (e.g. `unix:path=/run/user/1000/bus`).
    /// `None` means the session bus from the environment.
    pub address: Option<String>,
}

/// Where the previewer service lives on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    /// Well-known name calls are addressed to and signals are matched against
    pub service_name: String,
    pub object_path: String,
    /// Interface carrying `ShowFile` and `Close`
    pub interface: String,
    /// Interface carrying the `SelectionEvent` signal
    pub event_interface: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            service_name: PREVIEWER_DBUS_NAME.to_string(),
            object_path: PREVIEWER_DBUS_PATH.to_string(),
            interface: PREVIEWER_DBUS_IFACE.to_string(),
            event_interface: PREVIEWER_DBUS_EVENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("previewer.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.previewer.service_name, "org.gnome.NautilusPreviewer");
        assert_eq!(config.previewer.event_interface, "org.gnome.NautilusPreviewer2");
        assert!(config.bus.address.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("previewer.toml");
        fs::write(
            &path,
            "[previewer]\nservice_name = \"org.nemo.Preview\"\n\n\
             [bus]\naddress = \"unix:path=/tmp/bus\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.previewer.service_name, "org.nemo.Preview");
        assert_eq!(config.previewer.object_path, "/org/gnome/NautilusPreviewer");
        assert_eq!(config.bus.address.as_deref(), Some("unix:path=/tmp/bus"));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("previewer.toml");
        fs::write(&path, "[previewer\nservice_name = ").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn saved_default_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("previewer.toml");
        Config::save_default(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
