use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env,
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub max_pool_size: u32,
    pub pg_ssl_root_cert: Option<String>,
    pub pg_ssl_cert: Option<String>,
    pub pg_ssl_key: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
    pub default_top_limit: i64,
    pub max_top_limit: i64,
    pub request_timeout: Duration,
    pub pool_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    superstore_listen_addr: Option<String>,
    #[serde(default)]
    superstore_listen_host: Option<String>,
    #[serde(default)]
    superstore_listen_port: Option<u16>,
    #[serde(default)]
    superstore_database_url: Option<String>,
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default = "default_pool_size")]
    superstore_max_pool_size: u32,
    #[serde(default)]
    superstore_allowed_origins: Option<String>,
    #[serde(default = "default_top_limit")]
    superstore_default_top_limit: i64,
    #[serde(default = "default_max_top_limit")]
    superstore_max_top_limit: i64,
    #[serde(default = "default_timeout_secs")]
    superstore_request_timeout_secs: u64,
    #[serde(default = "default_pool_timeout_secs")]
    superstore_pool_timeout_secs: u64,
    #[serde(default)]
    pgsslrootcert: Option<String>,
    #[serde(default)]
    pgsslcert: Option<String>,
    #[serde(default)]
    pgsslkey: Option<String>,
}

const fn default_pool_size() -> u32 {
    10
}

const fn default_top_limit() -> i64 {
    10
}

const fn default_max_top_limit() -> i64 {
    500
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_pool_timeout_secs() -> u64 {
    10
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8490;

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse SUPERSTORE_* environment variables")?;

        let listen_addr = resolve_addr(
            raw.superstore_listen_addr,
            raw.superstore_listen_host,
            raw.superstore_listen_port,
        )?;

        let database_url = raw
            .superstore_database_url
            .or(raw.database_url)
            .or_else(|| env::var("DATABASE_URL").ok())
            .context("SUPERSTORE_DATABASE_URL or DATABASE_URL must be set")?;

        let default_top_limit = raw.superstore_default_top_limit.max(1);

        Ok(Self {
            listen_addr,
            database_url,
            max_pool_size: raw.superstore_max_pool_size.max(1),
            pg_ssl_root_cert: non_blank(raw.pgsslrootcert),
            pg_ssl_cert: non_blank(raw.pgsslcert),
            pg_ssl_key: non_blank(raw.pgsslkey),
            allowed_origins: raw.superstore_allowed_origins.and_then(|csv| parse_origins(&csv)),
            default_top_limit,
            max_top_limit: raw.superstore_max_top_limit.max(default_top_limit),
            request_timeout: Duration::from_secs(raw.superstore_request_timeout_secs.max(1)),
            pool_timeout: Duration::from_secs(raw.superstore_pool_timeout_secs.max(1)),
        })
    }

    /// Defaults for embedding the service (and for tests) with an explicit database URL.
    pub fn embedded(database_url: String) -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url,
            max_pool_size: default_pool_size(),
            pg_ssl_root_cert: None,
            pg_ssl_cert: None,
            pg_ssl_key: None,
            allowed_origins: None,
            default_top_limit: default_top_limit(),
            max_top_limit: default_max_top_limit(),
            request_timeout: Duration::from_secs(default_timeout_secs()),
            pool_timeout: Duration::from_secs(default_pool_timeout_secs()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_origins(csv: &str) -> Option<Vec<String>> {
    let origins: Vec<_> = csv
        .split(',')
        .filter_map(|part| {
            let entry = part.trim();
            if entry.is_empty() {
                None
            } else {
                Some(entry.to_string())
            }
        })
        .collect();
    if origins.is_empty() {
        None
    } else {
        Some(origins)
    }
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid SUPERSTORE_LISTEN_ADDR value")?
            .next()
            .context("SUPERSTORE_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = port.unwrap_or(DEFAULT_PORT);
    format!("{host}:{port}")
        .to_socket_addrs()
        .context("invalid listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_csv_drops_blank_entries() {
        assert_eq!(
            parse_origins(" http://localhost:3000 , ,https://dash.example.com"),
            Some(vec![
                "http://localhost:3000".to_string(),
                "https://dash.example.com".to_string()
            ])
        );
        assert_eq!(parse_origins(" , "), None);
    }

    #[test]
    fn explicit_addr_wins_over_host_and_port() {
        let addr = resolve_addr(
            Some("127.0.0.1:9000".to_string()),
            Some("10.0.0.1".to_string()),
            Some(1234),
        )
        .unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn host_and_port_fall_back_to_defaults() {
        let addr = resolve_addr(None, None, None).unwrap();
        assert_eq!(addr.port(), DEFAULT_PORT);

        let addr = resolve_addr(None, Some("127.0.0.1".to_string()), Some(8081)).unwrap();
        assert_eq!(addr, "127.0.0.1:8081".parse().unwrap());
    }

    #[test]
    fn embedded_config_uses_report_defaults() {
        let config = AppConfig::embedded("postgres://unused/db".to_string());
        assert_eq!(config.default_top_limit, 10);
        assert_eq!(config.max_top_limit, 500);
        assert!(config.allowed_origins.is_none());
        assert!(config.pool_timeout < config.request_timeout);
    }
}
