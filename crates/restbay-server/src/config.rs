use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Streaming block size used when no other value is configured.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Server configuration, sourced from CLI flags and an optional TOML file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// Base storage path all repositories live under.
    pub path: PathBuf,
    /// Maximum repository size in bytes; 0 means unlimited.
    pub max_repo_size: u64,
    /// Block deletion of everything except lock blobs.
    pub append_only: bool,
    /// Restrict each caller to the repository matching their identity.
    pub private_repos: bool,
    /// Also apply private-repo policy to the default repository
    /// (no caller identity can match it, so this locks it out entirely).
    pub private_default_repo: bool,
    /// Block size for streamed content delivery.
    pub block_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".parse().expect("valid default addr"),
            path: PathBuf::from("./restbay"),
            max_repo_size: 0,
            append_only: false,
            private_repos: false,
            private_default_repo: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file. Missing keys fall back to the
    /// defaults.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }
}
