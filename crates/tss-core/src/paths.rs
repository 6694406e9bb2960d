//! Standard paths used by the TSS tools

use std::path::PathBuf;

/// Standard TSS paths
pub struct Paths {
    /// Data directory (~/.local/share/tss)
    pub data: PathBuf,
    /// Config directory (~/.config/tss)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("tss");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("tss");

        Self { data, config }
    }

    /// Paths rooted somewhere other than the user's home (tests, sandboxes)
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data: root.join("data"),
            config: root.join("config"),
        }
    }

    /// The configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Default root of the local server stand-in
    pub fn server_root(&self) -> PathBuf {
        self.data.join("server")
    }

    /// Default directory for stored resource state
    pub fn state_dir(&self) -> PathBuf {
        self.data.join("state")
    }
}
