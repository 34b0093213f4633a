//! Centralised configuration loaded from .env / environment variables.
//!
//! Loading happens once at startup; credentials are injected into the
//! gateway at construction and never change for the session's lifetime.

use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Binance credentials
    pub api_key: String,
    pub api_secret: String,
    pub use_testnet: bool,

    // REST endpoint
    pub rest_url: String,

    /// Intent inversion: when true (default), the Long trigger places a
    /// SELL order and the Short trigger places a BUY order. `false`
    /// selects the naive mapping instead.
    pub invert_intent: bool,

    /// Wallet asset used for balances and notional amounts.
    pub quote_asset: String,
}

impl AppConfig {
    /// Load configuration from environment variables (after dotenv).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // ignore missing .env

        let api_key = env::var("BINANCE_API_KEY").unwrap_or_default();
        let api_secret = env::var("BINANCE_API_SECRET").unwrap_or_default();
        let use_testnet = env::var("BINANCE_USE_TESTNET")
            .unwrap_or_else(|_| "true".into())
            .to_lowercase()
            == "true";

        let rest_url = env::var("BINANCE_FUTURES_REST_URL").unwrap_or_else(|_| {
            if use_testnet {
                "https://testnet.binancefuture.com".into()
            } else {
                "https://fapi.binance.com".into()
            }
        });

        Ok(Self {
            api_key,
            api_secret,
            use_testnet,
            rest_url,
            invert_intent: parse_env("INVERT_INTENT", true)?,
            quote_asset: env::var("QUOTE_ASSET").unwrap_or_else(|_| "USDT".into()),
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + Copy,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Config key {key}: {e}")),
        Err(_) => Ok(default),
    }
}
