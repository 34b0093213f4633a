//! Domain types shared across the engine.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::EngineError;

/// Concrete order side in the exchange's wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing directional intent, before mapping to a concrete side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Upward bias ("Long" trigger).
    Long,
    /// Downward bias ("Short" trigger).
    Short,
}

impl Intent {
    /// Resolve the intent to an order side.
    ///
    /// With `inverted = true` the Long trigger yields a SELL order and
    /// the Short trigger a BUY order; this is the desk's documented
    /// wiring and the default. `inverted = false` is the naive mapping.
    /// Pure and total; the choice comes from configuration, never from
    /// market state.
    pub fn side(self, inverted: bool) -> Side {
        match (self, inverted) {
            (Intent::Long, true) | (Intent::Short, false) => Side::Sell,
            (Intent::Long, false) | (Intent::Short, true) => Side::Buy,
        }
    }
}

impl FromStr for Intent {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(Intent::Long),
            "short" => Ok(Intent::Short),
            _ => Err(EngineError::UnknownDirection(s.to_owned())),
        }
    }
}

/// Exchange constraints for one trading pair, re-resolved per order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRules {
    pub symbol: String,
    /// Smallest allowed quantity increment.
    pub step_size: Decimal,
    /// Floor for quantity * price.
    pub min_notional: Decimal,
}

/// An exchange-valid order ready for single-shot submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedOrder {
    pub symbol: String,
    pub side: Side,
    /// Quantity on the step grid of the symbol.
    pub quantity: Decimal,
    pub reduce_only: bool,
}

/// Exchange confirmation for a filled-or-accepted market order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "orderId")]
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
    pub side: String,
    #[serde(rename = "origQty", with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
    #[serde(rename = "executedQty", with = "rust_decimal::serde::str")]
    pub executed_qty: Decimal,
    #[serde(
        rename = "avgPrice",
        default,
        with = "rust_decimal::serde::str_option"
    )]
    pub avg_price: Option<Decimal>,
}

/// What the engine sent plus what the exchange acknowledged.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: SizedOrder,
    pub ack: OrderAck,
}

/// Outcome of a close request.
#[derive(Debug, Clone)]
pub enum CloseOutcome {
    /// A reduce-only offsetting order was submitted.
    Closed(PlacedOrder),
    /// No position existed; nothing was submitted.
    Flat,
}

/// Position snapshot as reported by the exchange. Read-only here; the
/// exchange owns the authoritative state.
#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed: positive = net long, negative = net short, zero = flat.
    #[serde(rename = "positionAmt", with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(rename = "entryPrice", with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    #[serde(
        rename = "unRealizedProfit",
        alias = "unrealizedProfit",
        default,
        with = "rust_decimal::serde::str_option"
    )]
    pub unrealized_pnl: Option<Decimal>,
}

/// One asset row from the futures wallet.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

/// Display-ready account state, rebuilt wholesale on every refresh.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub balance_usdt: Decimal,
    /// Open positions only (non-zero amount).
    pub positions: Vec<Position>,
    /// Sum of unrealized pnl over all reported positions.
    pub total_pnl: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_mapping_matches_reference_behavior() {
        assert_eq!(Intent::Long.side(true), Side::Sell);
        assert_eq!(Intent::Short.side(true), Side::Buy);
    }

    #[test]
    fn direct_mapping_is_naive() {
        assert_eq!(Intent::Long.side(false), Side::Buy);
        assert_eq!(Intent::Short.side(false), Side::Sell);
    }

    #[test]
    fn side_resolution_is_stable() {
        for _ in 0..3 {
            assert_eq!(Intent::Long.side(true), Side::Sell);
        }
    }

    #[test]
    fn intent_parses_case_insensitively() {
        assert_eq!("LONG".parse::<Intent>().unwrap(), Intent::Long);
        assert_eq!("short".parse::<Intent>().unwrap(), Intent::Short);
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let err = "sideways".parse::<Intent>().unwrap_err();
        assert!(matches!(err, EngineError::UnknownDirection(s) if s == "sideways"));
    }

    #[test]
    fn position_deserializes_position_risk_payload() {
        let raw = r#"{
            "symbol": "BTCUSDT",
            "positionAmt": "-2.5",
            "entryPrice": "20000.0",
            "unRealizedProfit": "-12.34"
        }"#;
        let pos: Position = serde_json::from_str(raw).unwrap();
        assert_eq!(pos.amount, rust_decimal_macros::dec!(-2.5));
        assert_eq!(pos.unrealized_pnl, Some(rust_decimal_macros::dec!(-12.34)));
    }

    #[test]
    fn position_tolerates_missing_pnl_field() {
        let raw = r#"{"symbol": "ETHUSDT", "positionAmt": "0.000", "entryPrice": "0.0"}"#;
        let pos: Position = serde_json::from_str(raw).unwrap();
        assert!(pos.amount.is_zero());
        assert_eq!(pos.unrealized_pnl, None);
    }
}
