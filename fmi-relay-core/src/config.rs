use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Endpoint used when no `base_url` is configured.
pub const DEFAULT_BASE_URL: &str = "http://data.fmi.fi";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// place = "Helsinki"
/// base_url = "http://data.fmi.fi"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// FMI API key. Omit it to query the keyless open-data endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Place name passed to the stored query, e.g. "Helsinki".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Place to observe, or an error pointing at `fmi-relay configure`.
    pub fn place(&self) -> Result<&str> {
        self.place
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No place configured.\n\
                     Hint: run `fmi-relay configure` or pass `--place <NAME>`."
                )
            })
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Overlay values given on the command line on top of the stored ones.
    pub fn with_overrides(
        mut self,
        api_key: Option<String>,
        place: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        if api_key.is_some() {
            self.api_key = api_key;
        }
        if place.is_some() {
            self.place = place;
        }
        if base_url.is_some() {
            self.base_url = base_url;
        }
        self
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "kellotaulu", "fmi-relay")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
