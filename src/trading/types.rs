//! Core order, position, and portfolio types

use super::ledger::round_cents;
use crate::market::Symbol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order type
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
            OrderType::Stop => write!(f, "stop"),
            OrderType::StopLimit => write!(f, "stop_limit"),
        }
    }
}

/// Order lifecycle status
///
/// `Pending` is the only non-terminal state. `Rejected` is reached
/// synchronously at submission and never stored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Trading mode; only paper semantics are implemented
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "paper"),
            TradingMode::Live => write!(f, "live"),
        }
    }
}

/// Order submission request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: u32,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: Side, quantity: u32) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            stop_price: None,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: Side, quantity: u32, limit_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(limit_price),
            stop_price: None,
        }
    }

    pub fn stop(symbol: impl Into<String>, side: Side, quantity: u32, stop_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Stop,
            quantity,
            limit_price: None,
            stop_price: Some(stop_price),
        }
    }

    pub fn stop_limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: u32,
        stop_price: f64,
        limit_price: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::StopLimit,
            quantity,
            limit_price: Some(limit_price),
            stop_price: Some(stop_price),
        }
    }
}

/// Order record
///
/// Created by the engine on submission and mutated only through the
/// engine's fill/cancel paths. `filled_price` and `filled_quantity` are
/// `Some` exactly when status is `Filled`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: u32,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub status: OrderStatus,
    pub filled_price: Option<f64>,
    pub filled_quantity: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub mode: TradingMode,
}

impl Order {
    pub(crate) fn new(symbol: Symbol, request: &OrderRequest, mode: TradingMode) -> Self {
        let now = Utc::now();
        Self {
            id: format!("ORD_{}_{}", now.timestamp_millis(), nanoid::nanoid!(8)),
            symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            status: OrderStatus::Pending,
            filled_price: None,
            filled_quantity: None,
            created_at: now,
            filled_at: None,
            mode,
        }
    }
}

/// Open holding in a single symbol
///
/// At most one position exists per symbol. A position whose quantity
/// reaches zero is removed from the ledger, never kept at zero.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub symbol: Symbol,
    pub quantity: u32,
    pub average_price: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub unrealized_pl: f64,
    pub unrealized_pl_percent: f64,
}

impl Position {
    pub(crate) fn open(symbol: Symbol, quantity: u32, price: f64) -> Self {
        Self {
            symbol,
            quantity,
            average_price: price,
            current_price: price,
            market_value: round_cents(price * quantity as f64),
            unrealized_pl: 0.0,
            unrealized_pl_percent: 0.0,
        }
    }

    /// Recompute derived fields against a new market price
    pub(crate) fn revalue(&mut self, current_price: f64) {
        self.current_price = current_price;
        self.market_value = round_cents(current_price * self.quantity as f64);
        self.unrealized_pl =
            round_cents((current_price - self.average_price) * self.quantity as f64);
        self.unrealized_pl_percent = if self.average_price > 0.0 {
            round_cents((current_price - self.average_price) / self.average_price * 100.0)
        } else {
            0.0
        };
    }

    /// Capital tied up at cost basis
    pub fn cost_basis(&self) -> f64 {
        round_cents(self.average_price * self.quantity as f64)
    }
}

/// Portfolio snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub buying_power: f64,
    pub positions: Vec<Position>,
    pub total_value: f64,
    pub total_pl: f64,
    pub total_pl_percent: f64,
}

/// Result of the position sizing calculator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSizingResult {
    pub suggested_shares: u64,
    pub max_shares: u64,
    pub risk_amount: f64,
    pub stop_loss_price: f64,
    pub max_loss: f64,
    pub risk_reward_ratio: f64,
}
