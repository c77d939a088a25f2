use anyhow::Result;
use std::env;

use crate::constants::DEFAULT_SERVER_PORT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => {
                return Err(anyhow::anyhow!(
                    "STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"
                ));
            }
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_SERVER_PORT),
            store_backend,
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
        })
    }
}
