//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/stratum/config.toml` (XDG) or platform config dir
//! 2. Project config: `.stratum.toml`
//! 3. Environment variables: `STRATUM_*`
//!
//! Every section has serde defaults, so an empty configuration is valid and
//! yields the documented defaults.
//!
//! ```toml
//! [repository]
//! related_properties_max_depth = 3
//! save_changes = "per-unit-of-work"
//!
//! [paging]
//! default_page_size = 20
//! max_page_size = 100
//!
//! [storage]
//! base_url = "https://objects.local"
//! bucket = "images"
//! ```

use std::ops::Deref;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub repository: RepositoryOptions,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// When tracked changes are written through to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveChangesStrategy {
    /// Flush after every repository mutation.
    PerOperation,
    /// Defer flushing to the unit-of-work scope while a transaction is open;
    /// flush immediately outside a scope.
    #[default]
    PerUnitOfWork,
}

/// Behavior knobs for the repository layer.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RepositoryOptions {
    /// Maximum navigation depth the related-property registry walks.
    #[serde(default = "default_max_depth")]
    pub related_properties_max_depth: usize,
    #[serde(default)]
    pub save_changes: SaveChangesStrategy,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            related_properties_max_depth: default_max_depth(),
            save_changes: SaveChangesStrategy::default(),
        }
    }
}

fn default_max_depth() -> usize {
    3
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

/// Object-storage settings for the image service.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bucket: default_bucket(),
        }
    }
}

fn default_base_url() -> String {
    "https://objects.local".to_string()
}

fn default_bucket() -> String {
    "images".to_string()
}

impl AppConfig {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        let user_config = Self::user_config_path();

        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(".stratum.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("STRATUM_").split("_"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// User config path: ~/.config/stratum/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("stratum").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("stratum").join("config.toml"))
            .unwrap_or_default()
    }
}
