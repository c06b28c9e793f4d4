//! Environment-driven configuration.

use anyhow::Context;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub gateway: GatewayConfig,
    pub admin: AdminConfig,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
}

/// Single hardcoded admin credential pair. Not a real security boundary;
/// replace with proper authentication before exposing this publicly.
#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse()
            .context("PORT is not a valid port number")?;
        Ok(Self {
            port,
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            gateway: GatewayConfig {
                base_url: std::env::var("GATEWAY_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
                key_id: std::env::var("GATEWAY_KEY_ID").context("GATEWAY_KEY_ID is not set")?,
                key_secret: std::env::var("GATEWAY_KEY_SECRET")
                    .context("GATEWAY_KEY_SECRET is not set")?,
            },
            admin: AdminConfig {
                username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                password: std::env::var("ADMIN_PASSWORD")
                    .unwrap_or_else(|_| "posters@123".to_string()),
            },
        })
    }
}
