//! HTTP server configuration.
//!
//! Every option can be given on the command line or through a
//! `JITTERPASS_*` environment variable.

use anyhow::Result;
use clap::Args;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_LOG_FILTER: &str = "jitterpass=info,tower_http=info";

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "JITTERPASS_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Maximum accepted request body, in bytes
    #[arg(long, env = "JITTERPASS_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,

    /// Upper bound on the handling time of one request, in seconds
    #[arg(long, env = "JITTERPASS_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            body_limit: DEFAULT_BODY_LIMIT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.body_limit == 0 {
            anyhow::bail!("Body limit must be greater than zero");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("Request timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
