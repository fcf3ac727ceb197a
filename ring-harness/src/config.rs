//! Harness configuration loading.
//!
//! Configuration is loaded from an optional TOML file (default:
//! `ringtest.toml`); CLI flags override individual fields.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration for the harness.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Node launcher executable; takes the node's private directory as its
    /// sole positional argument (default: `start-ring-node` on PATH).
    #[serde(default = "default_launcher")]
    pub launcher: PathBuf,

    /// Working-directory root for node state. A unique per-run directory
    /// under the system temp dir when unset.
    #[serde(default)]
    pub work_root: Option<PathBuf>,

    /// Resync interval handed to nodes, in seconds (default: 5).
    ///
    /// Far below the engine's production default, so convergence is
    /// observable within scenario timeouts.
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,

    /// External-file integrity-check interval handed to nodes, in seconds
    /// (default: 5).
    #[serde(default = "default_extfile_check_interval")]
    pub extfile_check_interval_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            launcher: default_launcher(),
            work_root: None,
            resync_interval_secs: default_resync_interval(),
            extfile_check_interval_secs: default_extfile_check_interval(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Environment overrides applied to every spawned node.
    pub fn node_env(&self) -> Vec<(String, String)> {
        vec![
            (
                "RING_RESYNC_INTERVAL".into(),
                self.resync_interval_secs.to_string(),
            ),
            (
                "RING_EXTFILE_CHECK_INTERVAL".into(),
                self.extfile_check_interval_secs.to_string(),
            ),
        ]
    }
}

// Default value functions
fn default_launcher() -> PathBuf {
    PathBuf::from("start-ring-node")
}

fn default_resync_interval() -> u64 {
    5
}

fn default_extfile_check_interval() -> u64 {
    5
}
