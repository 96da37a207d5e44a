//! Paper trading: order lifecycle, portfolio ledger, and audit trail

pub mod audit;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod sizing;
pub mod types;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use engine::{EngineConfig, TradingEngine};
pub use errors::TradingError;
pub use ledger::{FillOutcome, PortfolioLedger};
pub use sizing::{size_position, RISK_REWARD_TARGET};
pub use types::{
    Order, OrderRequest, OrderStatus, OrderType, Portfolio, Position, PositionSizingResult, Side,
    TradingMode,
};
