//! Paper trading engine library
//!
//! Simulates brokerage order execution and portfolio accounting: orders
//! move through a pending -> filled/cancelled lifecycle, fills mutate a
//! cash and buying-power ledger with weighted-average cost-basis
//! accounting, and every state-changing action lands in a bounded audit
//! trail. Market data is consumed through the injectable [`PriceSource`]
//! trait, so the engine runs against any asynchronous price feed.

pub mod market;
pub mod trading;

// Re-export main types for easy access
pub use market::{PriceSource, StaticPriceSource, Symbol};
pub use trading::{
    AuditAction, AuditEntry, EngineConfig, Order, OrderRequest, OrderStatus, OrderType, Portfolio,
    Position, PositionSizingResult, Side, TradingEngine, TradingError, TradingMode,
};
