//! Typed error taxonomy for the order engine.
//!
//! Every error is terminal for the action that raised it: nothing is
//! retried internally, and contextual values (computed vs required
//! notional, exchange rejection code) are carried to the caller verbatim.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Gateway unreachable, credentials rejected, or a malformed reply.
    #[error("gateway unreachable: {0}")]
    Connectivity(String),

    #[error("symbol {symbol} not found in exchange metadata")]
    SymbolNotFound { symbol: String },

    /// Exchange metadata lists the symbol but lacks a required filter.
    #[error("symbol {symbol} has no {filter} filter")]
    ConstraintMissing {
        symbol: String,
        filter: &'static str,
    },

    #[error("invalid price {price}")]
    InvalidPrice { price: Decimal },

    #[error("invalid step size {step_size}")]
    InvalidConstraint { step_size: Decimal },

    /// Sized order is below the exchange floor; never adjusted upward.
    #[error("notional {computed} USDT is below the minimum required {required} USDT")]
    BelowMinimumNotional { computed: Decimal, required: Decimal },

    #[error("unknown direction {0:?}, expected \"long\" or \"short\"")]
    UnknownDirection(String),

    /// Either underlying account read failed; no partial snapshot exists.
    #[error("account snapshot unavailable: {source}")]
    SnapshotUnavailable {
        #[source]
        source: Box<EngineError>,
    },

    /// Exchange-side rejection of a submitted order.
    #[error("order rejected by exchange: code {code}, {message}")]
    OrderRejected { code: i64, message: String },
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Connectivity(err.to_string())
    }
}
