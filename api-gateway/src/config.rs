//! API gateway configuration.
//!
//! The gateway's own settings come from defaults, overridable through
//! `API_LISTEN_ADDR`, `API_PROPOSER_ID` and `API_PRODUCE_BLOCKS`. The
//! underlying chain configuration is loaded with
//! `ChainConfig::from_env_or_default()`.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;

/// Configuration for the API gateway HTTP server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Identity the local block producer proposes under.
    pub proposer_id: String,
    /// Whether to run the background block producer.
    pub produce_blocks: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        // Bind to all interfaces so the container port mapping (8081→8081) is reachable
        // from the host when running under docker-compose.
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8081)),
            proposer_id: "node-local".to_string(),
            produce_blocks: true,
        }
    }
}

impl ApiConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        if let Some(addr) = lookup("API_LISTEN_ADDR") {
            cfg.listen_addr = addr
                .parse()
                .with_context(|| format!("invalid API_LISTEN_ADDR {addr:?}"))?;
        }
        if let Some(id) = lookup("API_PROPOSER_ID") {
            cfg.proposer_id = id;
        }
        if let Some(flag) = lookup("API_PRODUCE_BLOCKS") {
            cfg.produce_blocks = flag
                .parse()
                .with_context(|| format!("invalid API_PRODUCE_BLOCKS {flag:?}"))?;
        }
        Ok(cfg)
    }
}
