//! Configuration for FlatStore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{FlatError, Result};

/// Main configuration for a FlatStore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Backing file. Created on open if missing; the parent directory
    /// must already exist.
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync after a persist
    pub sync_strategy: SyncStrategy,
}

/// Sync strategy applied after each persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N persists (balanced durability/performance)
    EveryNWrites { count: usize },

    /// Leave flushing to the OS; only `close` syncs
    OsManaged,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("db/db.json"),
            sync_strategy: SyncStrategy::EveryWrite,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the store cannot honor
    pub fn validate(&self) -> Result<()> {
        if let SyncStrategy::EveryNWrites { count: 0 } = self.sync_strategy {
            return Err(FlatError::Config(
                "EveryNWrites count must be at least 1".to_string(),
            ));
        }
        if self.path.as_os_str().is_empty() {
            return Err(FlatError::Config("store path is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
