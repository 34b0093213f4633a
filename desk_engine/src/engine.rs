//! Order engine: the trigger-facing surface.
//!
//! One logical flow per triggered action. Trading actions on the same
//! symbol are serialized behind a per-symbol lock so two orders never
//! race a reused price/constraint read; the price and constraint fetches
//! inside one action are still independent round trips and may be stale
//! relative to each other, which is accepted. Snapshot refreshes are
//! read-only and take no lock.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::info;

use crate::account::build_snapshot;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::gateway::ExchangeGateway;
use crate::models::{
    AccountSnapshot, CloseOutcome, Intent, PlacedOrder, Side, SizedOrder,
};
use crate::sizing::{enforce_min_notional, resolve_rules, sized_quantity};

pub struct OrderEngine<G> {
    gateway: G,
    invert_intent: bool,
    quote_asset: String,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<G: ExchangeGateway> OrderEngine<G> {
    pub fn new(gateway: G, cfg: &AppConfig) -> Self {
        Self {
            gateway,
            invert_intent: cfg.invert_intent,
            quote_asset: cfg.quote_asset.clone(),
            locks: DashMap::new(),
        }
    }

    fn symbol_lock(&self, symbol: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(symbol.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Connectivity probe; returns the exchange clock in Unix millis.
    pub async fn probe(&self) -> Result<i64, EngineError> {
        self.gateway.server_time().await
    }

    /// All tradable pair names from exchange metadata.
    pub async fn trading_pairs(&self) -> Result<Vec<String>, EngineError> {
        let info = self.gateway.exchange_info().await?;
        Ok(info.symbols.into_iter().map(|s| s.symbol).collect())
    }

    /// Current mark price for one symbol.
    pub async fn symbol_price(&self, symbol: &str) -> Result<Decimal, EngineError> {
        self.gateway.symbol_price(symbol).await
    }

    /// Place a notional-sized MARKET order.
    ///
    /// Sizes the quantity onto the symbol's step grid, gates it against
    /// the notional floor, resolves the intent to a side, and submits
    /// exactly once. Every failure is terminal for this trigger.
    pub async fn place_order(
        &self,
        symbol: &str,
        notional_amount: Decimal,
        intent: Intent,
    ) -> Result<PlacedOrder, EngineError> {
        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().await;

        let price = self.gateway.symbol_price(symbol).await?;
        let info = self.gateway.exchange_info().await?;
        let rules = resolve_rules(&info, symbol)?;

        let quantity = sized_quantity(notional_amount, price, rules.step_size)?;
        let quantity = enforce_min_notional(quantity, price, rules.min_notional)?;
        let side = intent.side(self.invert_intent);

        info!(
            %symbol,
            ?intent,
            side = side.as_str(),
            %price,
            %quantity,
            notional = %(quantity * price),
            "sized order"
        );

        let ack = self
            .gateway
            .submit_market_order(symbol, side, quantity, false)
            .await?;

        Ok(PlacedOrder {
            order: SizedOrder {
                symbol: symbol.to_owned(),
                side,
                quantity,
                reduce_only: false,
            },
            ack,
        })
    }

    /// Flatten the position on `symbol` with one reduce-only MARKET
    /// order, or report `Flat` without touching the gateway's order
    /// endpoint when there is nothing to close.
    pub async fn close_position(&self, symbol: &str) -> Result<CloseOutcome, EngineError> {
        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().await;

        let positions = self.gateway.positions(Some(symbol)).await?;
        let Some(position) = positions.into_iter().find(|p| p.symbol == symbol) else {
            info!(%symbol, "no position recorded, nothing to close");
            return Ok(CloseOutcome::Flat);
        };
        if position.amount.is_zero() {
            info!(%symbol, "position already flat");
            return Ok(CloseOutcome::Flat);
        }

        let side = if position.amount > Decimal::ZERO {
            Side::Sell
        } else {
            Side::Buy
        };
        // Mirrors an already-filled quantity; no re-rounding needed.
        let quantity = position.amount.abs();

        info!(%symbol, side = side.as_str(), %quantity, "closing position");

        let ack = self
            .gateway
            .submit_market_order(symbol, side, quantity, true)
            .await?;

        Ok(CloseOutcome::Closed(PlacedOrder {
            order: SizedOrder {
                symbol: symbol.to_owned(),
                side,
                quantity,
                reduce_only: true,
            },
            ack,
        }))
    }

    /// Rebuild the account snapshot from two independent gateway reads.
    /// Either failure yields `SnapshotUnavailable`; a partial snapshot is
    /// never returned.
    pub async fn refresh_snapshot(&self) -> Result<AccountSnapshot, EngineError> {
        let balances = self
            .gateway
            .account_balance()
            .await
            .map_err(snapshot_unavailable)?;
        let positions = self
            .gateway
            .positions(None)
            .await
            .map_err(snapshot_unavailable)?;

        Ok(build_snapshot(&self.quote_asset, &balances, positions))
    }
}

fn snapshot_unavailable(err: EngineError) -> EngineError {
    EngineError::SnapshotUnavailable {
        source: Box::new(err),
    }
}
