//! Notional-to-quantity sizing and exchange constraint resolution.
//!
//! SIZING RULE:
//!   raw      = notional / price
//!   quantity = raw floored to the symbol's step grid, toward zero
//!
//! Flooring (never rounding to nearest) guarantees the realized notional
//! never exceeds the requested budget. A quantity whose notional falls
//! below the exchange floor is rejected outright; no adjusted or partial
//! order is ever submitted in its place.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::EngineError;
use crate::gateway::{ExchangeInfo, SymbolFilter};
use crate::models::SymbolRules;

/// Exchange floor applied when the symbol publishes no MIN_NOTIONAL
/// filter (Binance USDT-M futures default, in quote currency).
pub const DEFAULT_MIN_NOTIONAL: Decimal = dec!(100);

/// Extract the step-size and min-notional constraints for `symbol` from
/// exchange metadata. No side effects; safe to call repeatedly.
pub fn resolve_rules(info: &ExchangeInfo, symbol: &str) -> Result<SymbolRules, EngineError> {
    let entry = info
        .symbols
        .iter()
        .find(|s| s.symbol == symbol)
        .ok_or_else(|| EngineError::SymbolNotFound {
            symbol: symbol.to_owned(),
        })?;

    let mut step_size = None;
    let mut min_notional = None;
    for filter in &entry.filters {
        match filter {
            SymbolFilter::LotSize { step_size: s } => step_size = Some(*s),
            SymbolFilter::MinNotional { notional } => min_notional = Some(*notional),
            SymbolFilter::Other => {}
        }
    }

    let step_size = step_size.ok_or_else(|| EngineError::ConstraintMissing {
        symbol: symbol.to_owned(),
        filter: "LOT_SIZE",
    })?;

    Ok(SymbolRules {
        symbol: symbol.to_owned(),
        step_size,
        min_notional: min_notional.unwrap_or(DEFAULT_MIN_NOTIONAL),
    })
}

/// Convert a notional budget into a step-aligned base-asset quantity.
///
/// The result is quantized to the step's decimal precision via
/// `normalize().scale()`, which is stable against trailing-zero and
/// scientific-notation step encodings.
pub fn sized_quantity(
    notional: Decimal,
    price: Decimal,
    step_size: Decimal,
) -> Result<Decimal, EngineError> {
    if price <= Decimal::ZERO {
        return Err(EngineError::InvalidPrice { price });
    }
    if step_size <= Decimal::ZERO {
        return Err(EngineError::InvalidConstraint { step_size });
    }

    let raw = notional / price;
    let floored = raw - raw % step_size;
    let precision = step_size.normalize().scale();
    Ok(floored.round_dp_with_strategy(precision, RoundingStrategy::ToZero))
}

/// Gate a sized quantity against the exchange's notional floor.
pub fn enforce_min_notional(
    quantity: Decimal,
    price: Decimal,
    min_notional: Decimal,
) -> Result<Decimal, EngineError> {
    let computed = quantity * price;
    if computed < min_notional {
        return Err(EngineError::BelowMinimumNotional {
            computed,
            required: min_notional,
        });
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SymbolEntry;

    fn info_with(symbol: &str, filters: Vec<SymbolFilter>) -> ExchangeInfo {
        ExchangeInfo {
            symbols: vec![SymbolEntry {
                symbol: symbol.to_owned(),
                filters,
            }],
        }
    }

    #[test]
    fn resolves_step_and_notional_filters() {
        let info = info_with(
            "BTCUSDT",
            vec![
                SymbolFilter::Other,
                SymbolFilter::LotSize {
                    step_size: dec!(0.001),
                },
                SymbolFilter::MinNotional {
                    notional: dec!(5),
                },
            ],
        );
        let rules = resolve_rules(&info, "BTCUSDT").unwrap();
        assert_eq!(rules.step_size, dec!(0.001));
        assert_eq!(rules.min_notional, dec!(5));
    }

    #[test]
    fn min_notional_defaults_to_exchange_floor() {
        let info = info_with(
            "BTCUSDT",
            vec![SymbolFilter::LotSize {
                step_size: dec!(0.001),
            }],
        );
        let rules = resolve_rules(&info, "BTCUSDT").unwrap();
        assert_eq!(rules.min_notional, DEFAULT_MIN_NOTIONAL);
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let info = info_with("BTCUSDT", vec![]);
        let err = resolve_rules(&info, "DOGEUSDT").unwrap_err();
        assert!(matches!(err, EngineError::SymbolNotFound { symbol } if symbol == "DOGEUSDT"));
    }

    #[test]
    fn missing_lot_size_filter_is_an_error() {
        let info = info_with("BTCUSDT", vec![SymbolFilter::Other]);
        let err = resolve_rules(&info, "BTCUSDT").unwrap_err();
        assert!(
            matches!(err, EngineError::ConstraintMissing { filter, .. } if filter == "LOT_SIZE")
        );
    }

    #[test]
    fn sizes_500_usdt_at_25000() {
        let qty = sized_quantity(dec!(500), dec!(25000), dec!(0.001)).unwrap();
        assert_eq!(qty, dec!(0.020));
        let qty = enforce_min_notional(qty, dec!(25000), dec!(100)).unwrap();
        assert_eq!(qty * dec!(25000), dec!(500));
    }

    #[test]
    fn tiny_budget_floors_to_zero_and_is_rejected() {
        // 10 / 20000 = 0.0005, one half-step: floors to zero.
        let qty = sized_quantity(dec!(10), dec!(20000), dec!(0.001)).unwrap();
        assert!(qty.is_zero());
        let err = enforce_min_notional(qty, dec!(20000), dec!(100)).unwrap_err();
        match err {
            EngineError::BelowMinimumNotional { computed, required } => {
                assert_eq!(computed, Decimal::ZERO);
                assert_eq!(required, dec!(100));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn quantity_stays_on_step_grid_and_under_budget() {
        let cases = [
            (dec!(1000), dec!(30000), dec!(0.001)),
            (dec!(250), dec!(1.37), dec!(0.1)),
            (dec!(777), dec!(19334.5), dec!(0.002)),
            (dec!(150), dec!(0.0741), dec!(1)),
        ];
        for (notional, price, step) in cases {
            let qty = sized_quantity(notional, price, step).unwrap();
            assert!((qty % step).is_zero(), "{qty} not on step {step}");
            assert!(qty * price <= notional, "{qty} * {price} exceeds {notional}");
        }
    }

    #[test]
    fn trailing_zero_step_size_quantizes_correctly() {
        // "0.00100" normalizes to three decimal places.
        let step: Decimal = "0.00100".parse().unwrap();
        let qty = sized_quantity(dec!(500), dec!(25000), step).unwrap();
        assert_eq!(qty, dec!(0.02));
        assert!((qty % step).is_zero());
    }

    #[test]
    fn integer_step_size_floors_to_whole_units() {
        let qty = sized_quantity(dec!(1000), dec!(3.5), dec!(1)).unwrap();
        assert_eq!(qty, dec!(285));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let err = sized_quantity(dec!(500), Decimal::ZERO, dec!(0.001)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPrice { .. }));
        let err = sized_quantity(dec!(500), dec!(-1), dec!(0.001)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPrice { .. }));
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let err = sized_quantity(dec!(500), dec!(25000), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConstraint { .. }));
    }

    #[test]
    fn negative_notional_is_rejected_with_computed_value() {
        let qty = sized_quantity(dec!(-500), dec!(25000), dec!(0.001)).unwrap();
        assert!(qty <= Decimal::ZERO);
        let err = enforce_min_notional(qty, dec!(25000), dec!(100)).unwrap_err();
        match err {
            EngineError::BelowMinimumNotional { computed, required } => {
                assert_eq!(computed, dec!(-500));
                assert_eq!(required, dec!(100));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn below_floor_is_never_silently_adjusted() {
        // 120 / 20000 floors to 0.006 -> exactly 120 notional, passes.
        let qty = sized_quantity(dec!(120), dec!(20000), dec!(0.001)).unwrap();
        assert_eq!(enforce_min_notional(qty, dec!(20000), dec!(100)).unwrap(), qty);
        // 99.99 requested: floors under the floor, must error.
        let qty = sized_quantity(dec!(99.99), dec!(20000), dec!(0.001)).unwrap();
        assert!(matches!(
            enforce_min_notional(qty, dec!(20000), dec!(100)),
            Err(EngineError::BelowMinimumNotional { .. })
        ));
    }
}
