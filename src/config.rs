use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, anyhow};

use crate::acs::ConnectionString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamSettings {
    /// Deadline for each individual platform call.
    pub timeout: Duration,
    /// Extra attempts for idempotent reads.
    pub read_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            read_retries: 2,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub connection: ConnectionString,
    pub bind_addr: SocketAddr,
    pub upstream: UpstreamSettings,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let raw_connection = lookup("CONNECTION_STRING")
            .or_else(|| lookup("ACS_CONNECTION_STRING"))
            .filter(|s| !s.trim().is_empty())
            .ok_or(anyhow!("CONNECTION_STRING is required"))?;
        let connection = ConnectionString::parse(&raw_connection).context("CONNECTION_STRING")?;

        let host = lookup("HOST").unwrap_or("0.0.0.0".to_owned());
        let port: u16 = parse_or(&lookup, "PORT", 4000)?;
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid HOST/PORT {host}:{port}"))?;

        let defaults = UpstreamSettings::default();
        let upstream = UpstreamSettings {
            timeout: Duration::from_millis(parse_or(
                &lookup,
                "UPSTREAM_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )?),
            read_retries: parse_or(&lookup, "UPSTREAM_READ_RETRIES", defaults.read_retries)?,
            retry_backoff: defaults.retry_backoff,
        };

        Ok(Config {
            connection,
            bind_addr,
            upstream,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key}={raw:?}")),
        None => Ok(default),
    }
}
