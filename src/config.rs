// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into an [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `DATABASE_PATH` | redb database file | `./data/marketplace.redb` |
//! | `FRONTEND_URL` | CORS allowed origin(s), comma separated | `*` |
//! | `BLOCKCHAIN_NETWORK` | Network display name | `Polygon Mainnet` |
//! | `AITK_TOKEN_ADDRESS` | AITK token contract address | Optional |
//! | `ROUTER_ADDRESS` | Payment router contract address | Optional |
//! | `POLYGON_RPC_URL` | RPC endpoint handed to clients | Optional |
//! | `SERVICES_SEED_PATH` | JSON file with the service catalog | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Chain values are display-only. They are handed to clients verbatim and
//! never used by this service to reach the network.

use std::{env, net::SocketAddr, path::PathBuf};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Path of the redb file. This is the service's storage "connection string".
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const BLOCKCHAIN_NETWORK_ENV: &str = "BLOCKCHAIN_NETWORK";
pub const AITK_TOKEN_ADDRESS_ENV: &str = "AITK_TOKEN_ADDRESS";
pub const ROUTER_ADDRESS_ENV: &str = "ROUTER_ADDRESS";
pub const POLYGON_RPC_URL_ENV: &str = "POLYGON_RPC_URL";
pub const SERVICES_SEED_PATH_ENV: &str = "SERVICES_SEED_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATABASE_PATH: &str = "./data/marketplace.redb";
pub const DEFAULT_NETWORK: &str = "Polygon Mainnet";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Wildcard origin accepted by `FRONTEND_URL`.
pub const ANY_ORIGIN: &str = "*";

/// Chain values returned by the health and transaction endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub network: String,
    pub aitk_token: Option<String>,
    pub router: Option<String>,
    pub rpc_url: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            aitk_token: None,
            router: None,
            rpc_url: None,
        }
    }
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT` alone, so logging can start before the rest of the
    /// configuration is parsed.
    pub fn from_env() -> Self {
        env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Allowed CORS origins. Empty means any origin.
    pub frontend_origins: Vec<String>,
    pub chain: ChainConfig,
    pub services_seed_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            frontend_origins: Vec::new(),
            chain: ChainConfig::default(),
            services_seed_path: None,
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, default = DEFAULT_PORT, "Invalid PORT, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_path: get(DATABASE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            frontend_origins: parse_origins(get(FRONTEND_URL_ENV).as_deref()),
            chain: ChainConfig {
                network: get(BLOCKCHAIN_NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
                aitk_token: get(AITK_TOKEN_ADDRESS_ENV),
                router: get(ROUTER_ADDRESS_ENV),
                rpc_url: get(POLYGON_RPC_URL_ENV),
            },
            services_seed_path: get(SERVICES_SEED_PATH_ENV).map(PathBuf::from),
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        }
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Split `FRONTEND_URL` into explicit origins. A `*` anywhere means any origin.
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.iter().any(|o| o == ANY_ORIGIN) {
        Vec::new()
    } else {
        origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert!(config.frontend_origins.is_empty());
        assert_eq!(config.chain, ChainConfig::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn chain_values_pass_through_verbatim() {
        let config = config_from(&[
            (AITK_TOKEN_ADDRESS_ENV, "0xToken"),
            (ROUTER_ADDRESS_ENV, "0xRouter"),
            (POLYGON_RPC_URL_ENV, "https://polygon-rpc.com"),
        ]);
        assert_eq!(config.chain.aitk_token.as_deref(), Some("0xToken"));
        assert_eq!(config.chain.router.as_deref(), Some("0xRouter"));
        assert_eq!(config.chain.rpc_url.as_deref(), Some("https://polygon-rpc.com"));
        assert_eq!(config.chain.network, "Polygon Mainnet");
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let config = config_from(&[(PORT_ENV, "not-a-port")]);
        assert_eq!(config.port, DEFAULT_PORT);

        let config = config_from(&[(PORT_ENV, "8081")]);
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn frontend_origins_are_split_and_wildcard_collapses() {
        let config = config_from(&[(FRONTEND_URL_ENV, "https://a.example, https://b.example/")]);
        assert_eq!(
            config.frontend_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );

        let config = config_from(&[(FRONTEND_URL_ENV, "*")]);
        assert!(config.frontend_origins.is_empty());
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[(ROUTER_ADDRESS_ENV, "  "), (LOG_FORMAT_ENV, "JSON")]);
        assert!(config.chain.router.is_none());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn bind_addr_combines_host_and_port() {
        let config = config_from(&[(HOST_ENV, "127.0.0.1"), (PORT_ENV, "6000")]);
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:6000");
    }
}
