// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Environment-driven configuration for the skygraph binary.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub service_name: String,
    pub version: String,
    pub repo_dir: PathBuf,
    pub fetch_concurrency: usize,
    pub history_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr: SocketAddr = env::var("HTTP_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("invalid HTTP_ADDR")?;

        let service_name = env::var("SERVICE_NAME").unwrap_or_else(|_| "skygraph".into());
        let version = env::var("SERVICE_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").into());

        let repo_dir = PathBuf::from(env::var("SKYGRAPH_REPO_DIR").unwrap_or_else(|_| ".skygraph".into()));

        let fetch_concurrency: usize = env::var("SKYGRAPH_FETCH_CONCURRENCY")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .context("invalid SKYGRAPH_FETCH_CONCURRENCY")?;
        if fetch_concurrency == 0 {
            bail!("SKYGRAPH_FETCH_CONCURRENCY must be at least 1");
        }

        let history_limit: usize = env::var("SKYGRAPH_HISTORY_LIMIT")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .context("invalid SKYGRAPH_HISTORY_LIMIT")?;

        Ok(Self {
            http_addr,
            service_name,
            version,
            repo_dir,
            fetch_concurrency,
            history_limit,
        })
    }
}
