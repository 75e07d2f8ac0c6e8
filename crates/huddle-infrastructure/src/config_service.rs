//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the root configuration
//! from the configuration file (~/.config/huddle/config.toml) and applies
//! environment overrides on top.

use crate::paths::HuddlePaths;
use huddle_core::config::RootConfig;
use huddle_core::error::{HuddleError, Result};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

pub const ENV_BACKEND_URL: &str = "HUDDLE_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "HUDDLE_ANON_KEY";
pub const ENV_ACCESS_TOKEN: &str = "HUDDLE_ACCESS_TOKEN";

/// Configuration service that loads and caches the root configuration.
///
/// The file is read lazily on first access. A missing file is created with
/// defaults so users have something to edit.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService for the default config location.
    pub fn new() -> Result<Self> {
        let path = HuddlePaths::default()
            .config_file()
            .map_err(|e| HuddleError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    /// Creates a ConfigService reading from an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Gets the root configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<RootConfig> {
        if let Ok(read_lock) = self.config.read()
            && let Some(cached) = read_lock.as_ref()
        {
            return Ok(cached.clone());
        }

        let mut loaded = self.load_config()?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    /// Writes `config` to disk and refreshes the cache.
    pub fn save(&self, config: &RootConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        self.invalidate_cache();
        Ok(())
    }

    fn load_config(&self) -> Result<RootConfig> {
        if !self.path.exists() {
            tracing::info!(
                "[ConfigService] No config at {:?}, writing defaults",
                self.path
            );
            let defaults = RootConfig::default();
            self.save(&defaults)?;
            return Ok(defaults);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config: RootConfig = toml::from_str(&content)?;
        tracing::debug!("[ConfigService] Loaded config from {:?}", self.path);
        Ok(config)
    }
}

/// Applies environment overrides for the backend connection.
fn apply_env_overrides<F>(config: &mut RootConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BACKEND_URL) {
        config.backend.url = url;
    }
    if let Some(key) = lookup(ENV_ANON_KEY) {
        config.backend.anon_key = key;
    }
    if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
        config.backend.access_token = Some(token);
    }
}
