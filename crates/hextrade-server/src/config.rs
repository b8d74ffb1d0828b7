//! Server settings read from the environment.

use anyhow::Context;
use std::net::SocketAddr;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (`SERVER_ADDR`)
    pub addr: SocketAddr,
    /// `tracing` filter directive (`RUST_LOG`)
    pub log_filter: String,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(
            std::env::var("SERVER_ADDR").ok(),
            std::env::var("RUST_LOG").ok(),
        )
    }

    fn from_vars(addr: Option<String>, log_filter: Option<String>) -> anyhow::Result<Self> {
        let addr = addr.unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = addr
            .parse()
            .with_context(|| format!("invalid SERVER_ADDR {addr:?}"))?;
        Ok(Self {
            addr,
            log_filter: log_filter.unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_vars(None, None).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config =
            ServerConfig::from_vars(Some("127.0.0.1:9000".into()), Some("debug".into())).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_bad_address() {
        assert!(ServerConfig::from_vars(Some("nowhere".into()), None).is_err());
    }
}
