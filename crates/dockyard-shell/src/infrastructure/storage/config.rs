//! TOML-based application configuration.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Dockyard\dockyard.toml`
//! - Linux:    `~/.config/dockyard/dockyard.toml`
//! - macOS:    `~/Library/Application Support/Dockyard/dockyard.toml`
//!
//! Layout files live next to it, in `layouts/<name>.layout.toml`.
//!
//! ```toml
//! [shell]
//! log_level = "info"
//! memory_usage = "single"
//! current_layout = "Default"
//!
//! [recreate]
//! remove_delay_ms = 350
//! readd_delay_ms = 250
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a first run without a
//! config file, or an older file missing newer fields, still loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dockyard_core::domain::definition::MULTIPLE_LAYOUTS_NAME;
use dockyard_core::MemoryUsage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffix of every layout file name.
pub const LAYOUT_FILE_SUFFIX: &str = ".layout.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub recreate: RecreateConfig,
}

/// General shell behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellConfig {
    /// Schema version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// One layout at a time, or several sharing the hidden aggregate file.
    #[serde(default)]
    pub memory_usage: MemoryUsage,
    /// Layout loaded at start-up.
    #[serde(default = "default_current_layout")]
    pub current_layout: String,
}

/// Delays of the two-phase view recreation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecreateConfig {
    /// Delay before the old view is removed.
    #[serde(default = "default_remove_delay_ms")]
    pub remove_delay_ms: u64,
    /// Delay between the old view's destruction and the new view's creation.
    #[serde(default = "default_readd_delay_ms")]
    pub readd_delay_ms: u64,
}

impl RecreateConfig {
    pub fn remove_delay(&self) -> Duration {
        Duration::from_millis(self.remove_delay_ms)
    }

    pub fn readd_delay(&self) -> Duration {
        Duration::from_millis(self.readd_delay_ms)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_current_layout() -> String {
    "Default".to_string()
}
fn default_remove_delay_ms() -> u64 {
    350
}
fn default_readd_delay_ms() -> u64 {
    250
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
            memory_usage: MemoryUsage::default(),
            current_layout: default_current_layout(),
        }
    }
}

impl Default for RecreateConfig {
    fn default() -> Self {
        Self {
            remove_delay_ms: default_remove_delay_ms(),
            readd_delay_ms: default_readd_delay_ms(),
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

/// Determines the platform-appropriate config directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("dockyard.toml"))
}

/// Directory holding every layout file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn layouts_dir() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("layouts"))
}

/// File name of the layout called `name`.
pub fn layout_file_name(name: &str) -> String {
    format!("{name}{LAYOUT_FILE_SUFFIX}")
}

/// Layout file the shell should open for `config`.
///
/// In multi-layout mode every layout shares the hidden aggregate file.
pub fn active_layout_file(dir: &Path, config: &AppConfig) -> PathBuf {
    let name = match config.shell.memory_usage {
        MemoryUsage::Single => config.shell.current_layout.as_str(),
        MemoryUsage::Multiple => MULTIPLE_LAYOUTS_NAME,
    };
    dir.join(layout_file_name(name))
}

/// Recovers a layout name from a layout file path.
///
/// `/x/layouts/Work.layout.toml` gives `Work`.  Paths without the layout
/// suffix fall back to the file stem.
pub fn layout_name_from_file(path: &Path) -> String {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return String::new();
    };
    if let Some(name) = file_name.strip_suffix(LAYOUT_FILE_SUFFIX) {
        return name.to_string();
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning defaults when it is absent.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating the directory when needed.
///
/// # Errors
///
/// See [`save_config`].
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the `dockyard`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Dockyard"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("dockyard"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Dockyard")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
