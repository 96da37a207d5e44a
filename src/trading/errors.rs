//! Trading error taxonomy

use super::types::OrderStatus;
use thiserror::Error;

/// Errors surfaced by the trading engine
///
/// All variants are detected synchronously at the point of violation and
/// never retried internally. A failed submission stores no order and
/// writes no audit entry; a failed fill leaves the ledger untouched.
#[derive(Debug, Error)]
pub enum TradingError {
    #[error("invalid quantity: shares must be a positive whole number")]
    InvalidQuantity,

    #[error("insufficient funds: required ${required:.2}, available ${available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("no sellable position in {symbol}")]
    PositionNotFound { symbol: String },

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("order {id} is {status}, expected pending")]
    InvalidState { id: String, status: OrderStatus },

    /// Price source failures pass through unwrapped; retry policy belongs
    /// to the caller.
    #[error(transparent)]
    Price(#[from] anyhow::Error),
}
