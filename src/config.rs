//! # Settings for bases1c
//!
//! This module resolves where the 1C:Enterprise launcher keeps its
//! registration files and where the platform keeps infobase caches.
//! Values are layered: command line / environment first, then an optional
//! `config.toml`, then platform defaults taken from [`dirs`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Folder under the application-data directories owned by 1C.
const VENDOR_DIR: &str = "1C";

/// Launcher folder holding `ibases.v8i` and `1CEStart.cfg`.
const START_DIR: &str = "1CEStart";

/// Platform folders that may hold infobase caches.
const DEFAULT_VERSIONS: [&str; 2] = ["1Cv8", "1Cv82"];

/// Contents of an optional `config.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// The `1C` folder under the roaming application data directory.
    pub roaming_root: Option<PathBuf>,
    /// The `1C` folder under the local application data directory.
    pub local_root: Option<PathBuf>,
    /// Platform folders scanned for caches under both roots.
    pub versions: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        let parsed: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML from {}", path.as_ref().display()))?;

        Ok(parsed)
    }

    /// Load the explicitly requested file, or the default one if it exists.
    ///
    /// A missing default file yields empty settings; a missing explicit file
    /// is an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_file() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading settings");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }
}

fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bases1c").join("config.toml"))
}

/// Fully resolved locations used by the commands.
#[derive(Debug, Clone)]
pub struct Layout {
    pub roaming_root: PathBuf,
    pub local_root: PathBuf,
    pub versions: Vec<String>,
}

impl Layout {
    /// Merge command line overrides over file settings over platform defaults.
    pub fn resolve(
        settings: Settings,
        roaming_root: Option<PathBuf>,
        local_root: Option<PathBuf>,
    ) -> Result<Self> {
        let roaming_root = match roaming_root.or(settings.roaming_root) {
            Some(path) => path,
            // %APPDATA% on Windows
            None => dirs::config_dir()
                .context("Failed to locate roaming application data directory")?
                .join(VENDOR_DIR),
        };
        let local_root = match local_root.or(settings.local_root) {
            Some(path) => path,
            // %LOCALAPPDATA% on Windows
            None => dirs::data_local_dir()
                .context("Failed to locate local application data directory")?
                .join(VENDOR_DIR),
        };
        let versions = settings
            .versions
            .unwrap_or_else(|| DEFAULT_VERSIONS.iter().map(|v| v.to_string()).collect());

        Ok(Self {
            roaming_root,
            local_root,
            versions,
        })
    }

    /// The user's `ibases.v8i` registration list.
    pub fn registry_file(&self) -> PathBuf {
        self.roaming_root.join(START_DIR).join("ibases.v8i")
    }

    /// The launcher config that may point at a shared registration list.
    pub fn start_config_file(&self) -> PathBuf {
        self.roaming_root.join(START_DIR).join("1CEStart.cfg")
    }

    pub fn roaming_cache_roots(&self) -> Vec<PathBuf> {
        self.versions.iter().map(|v| self.roaming_root.join(v)).collect()
    }

    pub fn local_cache_roots(&self) -> Vec<PathBuf> {
        self.versions.iter().map(|v| self.local_root.join(v)).collect()
    }
}
