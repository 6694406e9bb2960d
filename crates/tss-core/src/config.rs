//! Tool configuration
//!
//! Read from `<config dir>/config.json`. Every field has a default, so a
//! missing file is the same as an empty one. `TSS_SERVER_ROOT`,
//! `TSS_STATE_DIR` and `TSS_LOG` override the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::paths::Paths;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings shared by the TSS tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Root directory of the local secret server
    #[serde(default)]
    pub server_root: Option<PathBuf>,

    /// Directory holding stored resource state
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    /// Load the configuration for the given paths, applying environment overrides
    pub fn load(paths: &Paths) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&paths.config_file())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from an environment-like lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("TSS_SERVER_ROOT").filter(|v| !v.is_empty()) {
            self.server_root = Some(PathBuf::from(root));
        }
        if let Some(dir) = lookup("TSS_STATE_DIR").filter(|v| !v.is_empty()) {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = lookup("TSS_LOG").filter(|v| !v.is_empty()) {
            self.log_filter = Some(filter);
        }
    }

    pub fn server_root(&self, paths: &Paths) -> PathBuf {
        self.server_root
            .clone()
            .unwrap_or_else(|| paths.server_root())
    }

    pub fn state_dir(&self, paths: &Paths) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| paths.state_dir())
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_load_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"server_root": "/srv/tss", "log_filter": "debug"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        let paths = Paths::rooted(dir.path());
        assert_eq!(config.server_root(&paths), PathBuf::from("/srv/tss"));
        assert_eq!(config.state_dir(&paths), paths.state_dir());
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TSS_SERVER_ROOT", "/env/server"),
            ("TSS_STATE_DIR", ""),
            ("TSS_LOG", "trace"),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            state_dir: Some(PathBuf::from("/file/state")),
            ..Default::default()
        };
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server_root, Some(PathBuf::from("/env/server")));
        // Empty values do not override
        assert_eq!(config.state_dir, Some(PathBuf::from("/file/state")));
        assert_eq!(config.log_filter(), "trace");
    }
}
