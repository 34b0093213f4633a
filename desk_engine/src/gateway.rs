//! Exchange gateway: trait boundary plus the Binance USDT-M Futures
//! implementation.
//!
//! BINANCE SIGNED REQUEST FLOW:
//!   1. Build query string with required params
//!   2. Append server-synced timestamp
//!   3. Sign query string with HMAC-SHA256 using the API secret
//!   4. Send with X-MBX-APIKEY header
//!
//! All calls are single round trips with no retry; a failed call fails
//! the triggering action and is surfaced to the caller as a typed error.

use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::EngineError;
use crate::models::{AssetBalance, OrderAck, Position, Side};
use crate::time_sync::TimeSync;

type HmacSha256 = Hmac<Sha256>;

const HTTP_TIMEOUT_SECS: u64 = 10;

// ── Wire types ────────────────────────────────────────────────────────────

/// Futures exchangeInfo payload, reduced to what sizing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolEntry {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Per-symbol trading filters. Only lot size and notional floor matter
/// here; everything else collapses into `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize", with = "rust_decimal::serde::str")]
        step_size: Decimal,
    },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional {
        #[serde(with = "rust_decimal::serde::str")]
        notional: Decimal,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct BinanceApiError {
    code: i64,
    msg: String,
}

// ── Gateway trait ─────────────────────────────────────────────────────────

/// Boundary the engine consumes. Authoritative, possibly-failing remote
/// service; implemented by [`BinanceGateway`] and by mocks in tests.
#[allow(async_fn_in_trait)]
pub trait ExchangeGateway {
    /// Connectivity probe; returns the exchange clock in Unix millis.
    async fn server_time(&self) -> Result<i64, EngineError>;

    async fn exchange_info(&self) -> Result<ExchangeInfo, EngineError>;

    async fn symbol_price(&self, symbol: &str) -> Result<Decimal, EngineError>;

    async fn account_balance(&self) -> Result<Vec<AssetBalance>, EngineError>;

    async fn positions(&self, symbol: Option<&str>) -> Result<Vec<Position>, EngineError>;

    /// Submit a single MARKET order. One atomic call; never retried.
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck, EngineError>;
}

// ── Binance implementation ────────────────────────────────────────────────

pub struct BinanceGateway {
    client: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
    time_sync: TimeSync,
}

impl BinanceGateway {
    pub fn new(cfg: &AppConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| EngineError::Connectivity(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            base_url: cfg.rest_url.clone(),
            time_sync: TimeSync::new(),
        })
    }

    /// Sign a query string with HMAC-SHA256.
    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        decode_read(resp).await
    }

    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &str,
    ) -> Result<T, EngineError> {
        let ts = self.time_sync.timestamp_ms();
        let query = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let signature = self.sign(&query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        let resp = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;
        decode_read(resp).await
    }
}

/// Decode a read-path response; any non-2xx outcome is a connectivity
/// failure for the triggering action.
async fn decode_read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, EngineError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(EngineError::Connectivity(format!(
            "HTTP {status}: {body}"
        )));
    }
    serde_json::from_str(&body)
        .map_err(|e| EngineError::Connectivity(format!("malformed response: {e}")))
}

impl ExchangeGateway for BinanceGateway {
    async fn server_time(&self) -> Result<i64, EngineError> {
        // Probe and clock sync in one round trip.
        self.time_sync.sync(&self.client, &self.base_url).await
    }

    async fn exchange_info(&self) -> Result<ExchangeInfo, EngineError> {
        self.get_public("/fapi/v1/exchangeInfo").await
    }

    async fn symbol_price(&self, symbol: &str) -> Result<Decimal, EngineError> {
        let ticker: TickerPrice = self
            .get_public(&format!("/fapi/v1/ticker/price?symbol={symbol}"))
            .await?;
        Ok(ticker.price)
    }

    async fn account_balance(&self) -> Result<Vec<AssetBalance>, EngineError> {
        self.get_signed("/fapi/v2/balance", "").await
    }

    async fn positions(&self, symbol: Option<&str>) -> Result<Vec<Position>, EngineError> {
        let params = match symbol {
            Some(s) => format!("symbol={s}"),
            None => String::new(),
        };
        self.get_signed("/fapi/v2/positionRisk", &params).await
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck, EngineError> {
        // normalize() strips trailing zeros; precision is per-symbol, not
        // a fixed decimal count.
        let qty_str = quantity.normalize().to_string();

        let mut params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}",
            symbol,
            side.as_str(),
            qty_str
        );
        if reduce_only {
            params.push_str("&reduceOnly=true");
        }
        let ts = self.time_sync.timestamp_ms();
        let query = format!("{params}&timestamp={ts}");
        let signature = self.sign(&query);
        let full_params = format!("{query}&signature={signature}");

        let url = format!("{}/fapi/v1/order", self.base_url);

        info!(%symbol, side = side.as_str(), qty = %qty_str, reduce_only, "submitting MARKET order");

        let resp = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(full_params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status != StatusCode::OK {
            return Err(match serde_json::from_str::<BinanceApiError>(&body) {
                Ok(api_err) => {
                    error!(code = api_err.code, msg = %api_err.msg, "exchange rejected order");
                    EngineError::OrderRejected {
                        code: api_err.code,
                        message: api_err.msg,
                    }
                }
                Err(_) => EngineError::Connectivity(format!("HTTP {status}: {body}")),
            });
        }

        let ack: OrderAck = serde_json::from_str(&body)
            .map_err(|e| EngineError::Connectivity(format!("malformed order response: {e}")))?;

        info!(
            order_id = ack.order_id,
            status = %ack.status,
            executed = %ack.executed_qty,
            "order acknowledged"
        );
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use rust_decimal_macros::dec;

    fn gateway_with_secret(secret: &str) -> BinanceGateway {
        let cfg = AppConfig {
            api_key: "key".into(),
            api_secret: secret.into(),
            use_testnet: true,
            rest_url: "https://testnet.binancefuture.com".into(),
            invert_intent: true,
            quote_asset: "USDT".into(),
        };
        BinanceGateway::new(&cfg).unwrap()
    }

    #[test]
    fn signature_matches_exchange_sample() {
        // Documented sample API secret from the Binance signing guide.
        let gw = gateway_with_secret(
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j",
        );
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC\
                     &quantity=1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            gw.sign(query),
            "3c57dca8d0949094f7bd6fc10c0bd58382ff4254b2b2cd136962330d96f24e71"
        );
    }

    #[test]
    fn exchange_info_parses_filters() {
        let raw = r#"{
            "symbols": [{
                "symbol": "BTCUSDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.10"},
                    {"filterType": "LOT_SIZE", "stepSize": "0.001",
                     "minQty": "0.001", "maxQty": "1000"},
                    {"filterType": "MIN_NOTIONAL", "notional": "100"}
                ]
            }]
        }"#;
        let info: ExchangeInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.symbols.len(), 1);
        let steps: Vec<_> = info.symbols[0]
            .filters
            .iter()
            .filter_map(|f| match f {
                SymbolFilter::LotSize { step_size } => Some(*step_size),
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec![dec!(0.001)]);
    }

    #[test]
    fn order_ack_parses() {
        let raw = r#"{
            "orderId": 42,
            "symbol": "BTCUSDT",
            "status": "FILLED",
            "side": "SELL",
            "origQty": "0.02",
            "executedQty": "0.02",
            "avgPrice": "25000.00"
        }"#;
        let ack: OrderAck = serde_json::from_str(raw).unwrap();
        assert_eq!(ack.order_id, 42);
        assert_eq!(ack.orig_qty, dec!(0.02));
        assert_eq!(ack.avg_price, Some(dec!(25000)));
    }

    #[test]
    fn balance_row_parses() {
        let raw = r#"[{"asset": "USDT", "balance": "122607.35137903"}]"#;
        let rows: Vec<AssetBalance> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows[0].balance, dec!(122607.35137903));
    }
}
