use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use restbay_server::ServerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "restbay",
    about = "REST storage backend for content-addressed backup clients",
    version,
)]
pub struct Cli {
    /// Address to bind the HTTP listener to
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Base storage path all repositories live under
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Maximum repository size in bytes (0 = unlimited)
    #[arg(long)]
    pub max_size: Option<u64>,

    /// Refuse deletion of everything except lock blobs
    #[arg(long)]
    pub append_only: bool,

    /// Confine each caller to the repository matching their identity
    #[arg(long)]
    pub private_repos: bool,

    /// Also apply private-repo policy to the default repository
    #[arg(long)]
    pub private_default_repo: bool,

    /// Block size for streamed content delivery, in bytes
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Read configuration from a TOML file; explicit flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective server configuration: TOML file first (when
    /// given), then explicit flags on top.
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_toml_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(path) = self.path {
            config.path = path;
        }
        if let Some(max_size) = self.max_size {
            config.max_repo_size = max_size;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if self.append_only {
            config.append_only = true;
        }
        if self.private_repos {
            config.private_repos = true;
        }
        if self.private_default_repo {
            config.private_default_repo = true;
        }
        Ok(config)
    }
}
