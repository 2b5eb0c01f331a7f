use std::net::SocketAddr;

use anyhow::Context;

/// Server settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite URL for the local store.
    pub database_url: Option<String>,
    /// Base URL of the hosted store. Wins over `database_url` when both are set.
    pub gateway_url: Option<String>,
    pub gateway_key: Option<String>,
    pub session_minutes: i64,
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            gateway_url: None,
            gateway_key: None,
            session_minutes: 30,
            cors_origin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let defaults = Config::default();

        let bind_addr = match var("BIND_ADDR") {
            Some(addr) => addr.parse().with_context(|| format!("BIND_ADDR {addr:?} is not a socket address"))?,
            None => defaults.bind_addr,
        };
        let session_minutes = match var("SESSION_MINUTES") {
            Some(minutes) => minutes.parse().with_context(|| format!("SESSION_MINUTES {minutes:?} is not a number"))?,
            None => defaults.session_minutes,
        };

        let gateway_url = var("GATEWAY_URL").filter(|url| !url.is_empty());
        let gateway_key = var("GATEWAY_KEY");
        if gateway_url.is_some() && gateway_key.is_none() {
            anyhow::bail!("GATEWAY_URL is set but GATEWAY_KEY is missing");
        }

        Ok(Config {
            bind_addr,
            database_url: var("DATABASE_URL").filter(|url| !url.is_empty()),
            gateway_url,
            gateway_key,
            session_minutes,
            cors_origin: var("CORS_ORIGIN"),
        })
    }
}
