//! Command-line flags for the `farmai` binary.
//!
//! Flags override the environment; everything else comes from
//! [`ServerConfig`](crate::config::ServerConfig).

use std::path::PathBuf;

use clap::Parser;

use crate::config::ServerConfig;

/// FarmAI data gateway: cached weather, soil and crop-model APIs
#[derive(Debug, Parser)]
#[command(name = "farmai", author, version, about = "FarmAI data gateway HTTP server")]
pub struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Load variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

impl Cli {
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config
    }
}
