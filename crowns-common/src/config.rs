//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `CROWNS_ROOT_FOLDER`
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file never stops startup; it is logged
//! and defaults are used.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::csv_codec::ColumnLabels;
use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CROWNS_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "crowns.db";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    /// Table used to seed a new user's collection
    pub template_path: Option<PathBuf>,
    /// Folder holding `monsters/<slug>.png` artwork
    pub assets_path: Option<PathBuf>,
    /// Header labels of imported and exported tables
    pub columns: Option<ColumnLabels>,
}

impl TomlConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load a config file, degrading to defaults on any problem
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Ignoring config {}: {}", path.display(), e);
            Self::default()
        })
    }
}

/// Platform defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Resolves the root folder following the priority order above
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml: TomlConfig,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml: TomlConfig) -> Self {
        Self { cli_arg, toml }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml.root_folder {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Fully resolved tracker settings
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
    pub template_path: Option<PathBuf>,
    pub assets_path: PathBuf,
    pub column_labels: ColumnLabels,
}

/// Values given on the command line (or their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub template_path: Option<PathBuf>,
    pub assets_path: Option<PathBuf>,
}

impl TrackerConfig {
    /// Merge CLI overrides over the TOML file over compiled defaults
    pub fn resolve(cli: CliOverrides, toml: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let root_folder = RootFolderResolver::new(cli.root_folder, toml.clone()).resolve();

        let assets_path = cli
            .assets_path
            .or(toml.assets_path)
            .unwrap_or_else(|| root_folder.join("public"));

        let template_path = cli.template_path.or(toml.template_path).or_else(|| {
            let candidate = assets_path.join("template.csv");
            candidate.exists().then_some(candidate)
        });

        Self {
            bind: cli.bind.or(toml.bind).unwrap_or(defaults.bind),
            port: cli.port.or(toml.port).unwrap_or(defaults.port),
            log_level: cli.log_level.or(toml.log_level).unwrap_or(defaults.log_level),
            template_path,
            assets_path,
            root_folder,
            column_labels: toml.columns.unwrap_or_default(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }
}

/// Locate the config file for the platform, if one exists
///
/// Linux checks `~/.config/crowns/config.toml` then `/etc/crowns/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("crowns").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/crowns/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("crowns"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\crowns"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("crowns"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/crowns"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("crowns"))
            .unwrap_or_else(|| PathBuf::from("./crowns_data"))
    }
}
