//! Account snapshot aggregation.
//!
//! Pure read-path: balances and positions come in from two independent
//! gateway reads, the snapshot is rebuilt wholesale from them. Partial
//! state is never produced here; the engine fails the whole refresh when
//! either read fails.

use rust_decimal::Decimal;

use crate::models::{AccountSnapshot, AssetBalance, Position};

/// Aggregate wallet balances and position rows into a display-ready
/// snapshot.
///
/// The retained positions are the open ones (non-zero amount), while the
/// pnl total sums over every reported row, absent pnl fields counting as
/// zero. A missing quote-asset row aggregates as a zero balance.
pub fn build_snapshot(
    quote_asset: &str,
    balances: &[AssetBalance],
    positions: Vec<Position>,
) -> AccountSnapshot {
    let balance_usdt = balances
        .iter()
        .find(|b| b.asset == quote_asset)
        .map(|b| b.balance)
        .unwrap_or(Decimal::ZERO);

    let total_pnl: Decimal = positions.iter().filter_map(|p| p.unrealized_pnl).sum();

    let positions = positions
        .into_iter()
        .filter(|p| !p.amount.is_zero())
        .collect();

    AccountSnapshot {
        balance_usdt,
        positions,
        total_pnl,
    }
}
