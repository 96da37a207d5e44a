//! Append-only audit trail for every state-changing action

use super::types::{Order, OrderType, Side, TradingMode};
use crate::market::Symbol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Action tags recorded in the audit trail
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    #[serde(rename = "order.placed")]
    OrderPlaced,
    #[serde(rename = "order.filled")]
    OrderFilled,
    #[serde(rename = "order.cancelled")]
    OrderCancelled,
    #[serde(rename = "account.reset")]
    AccountReset,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OrderPlaced => "order.placed",
            AuditAction::OrderFilled => "order.filled",
            AuditAction::OrderCancelled => "order.cancelled",
            AuditAction::AccountReset => "account.reset",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single audit record, never edited after being appended
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub symbol: Option<Symbol>,
    pub side: Option<Side>,
    pub quantity: Option<u32>,
    pub price: Option<f64>,
    pub order_type: Option<OrderType>,
    pub mode: TradingMode,
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, mode: TradingMode) -> Self {
        let now = Utc::now();
        Self {
            id: format!("AUD_{}_{}", now.timestamp_millis(), nanoid::nanoid!(8)),
            timestamp: now,
            action,
            symbol: None,
            side: None,
            quantity: None,
            price: None,
            order_type: None,
            mode,
            metadata: None,
        }
    }

    /// Entry pre-populated with an order's identifying context
    pub fn for_order(action: AuditAction, order: &Order) -> Self {
        let mut entry = Self::new(action, order.mode);
        entry.symbol = Some(order.symbol.clone());
        entry.side = Some(order.side);
        entry.quantity = Some(order.quantity);
        entry.order_type = Some(order.order_type);
        entry
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Bounded, chronological audit log
///
/// Entries are kept oldest-first. Once the cap is exceeded the oldest
/// entries are discarded; nothing else removes or edits an entry short
/// of a full account reset.
#[derive(Debug)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    max_entries: usize,
}

impl AuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in chronological order, oldest first
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries.iter().cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
