//! Portfolio ledger: cash, buying power, and open positions

use super::errors::TradingError;
use super::types::{Portfolio, Position, Side};
use crate::market::Symbol;
use std::collections::HashMap;

/// Round a dollar amount to cents, half away from zero
///
/// Every monetary figure in the ledger (cash, cost basis, proceeds, P/L)
/// goes through this one helper so repeated computations cannot drift.
pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result of applying one fill to the ledger
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillOutcome {
    /// Realized P/L for sell fills, `None` for buys. Not retained as
    /// ledger state; the caller records it in the audit trail.
    pub realized_pl: Option<f64>,
}

/// Cash, buying power, and per-symbol positions for one account
///
/// `apply_fill` is the single mutation entry point and must be invoked
/// exactly once per filled order. Buying power always mirrors cash under
/// the margin multiplier, so it can never drift from the cash balance.
#[derive(Debug)]
pub struct PortfolioLedger {
    initial_cash: f64,
    margin_multiplier: f64,
    cash: f64,
    buying_power: f64,
    positions: HashMap<Symbol, Position>,
}

impl PortfolioLedger {
    pub fn new(initial_cash: f64, margin_multiplier: f64) -> Self {
        let cash = round_cents(initial_cash);
        Self {
            initial_cash: cash,
            margin_multiplier,
            cash,
            buying_power: round_cents(cash * margin_multiplier),
            positions: HashMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn buying_power(&self) -> f64 {
        self.buying_power
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn open_symbols(&self) -> Vec<Symbol> {
        self.positions.keys().cloned().collect()
    }

    /// Apply a filled trade to the account
    ///
    /// All-or-nothing: when this returns an error, cash, buying power,
    /// and positions are exactly as they were before the call.
    pub fn apply_fill(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u32,
        price: f64,
    ) -> Result<FillOutcome, TradingError> {
        let price = round_cents(price);
        match side {
            Side::Buy => self.apply_buy(symbol, quantity, price),
            Side::Sell => self.apply_sell(symbol, quantity, price),
        }
    }

    fn apply_buy(
        &mut self,
        symbol: &Symbol,
        quantity: u32,
        price: f64,
    ) -> Result<FillOutcome, TradingError> {
        let cost = round_cents(price * quantity as f64);

        // The submission-time check may have used a stale market price;
        // the ledger is the final authority.
        if cost > self.buying_power {
            return Err(TradingError::InsufficientFunds {
                required: cost,
                available: self.buying_power,
            });
        }

        match self.positions.get_mut(symbol) {
            Some(position) => {
                // Weighted-average cost basis, using the fill cost rather
                // than a re-derived market price.
                let new_quantity = position.quantity + quantity;
                let total_cost = position.average_price * position.quantity as f64 + cost;
                position.quantity = new_quantity;
                position.average_price = round_cents(total_cost / new_quantity as f64);
                position.revalue(price);
            }
            None => {
                self.positions
                    .insert(symbol.clone(), Position::open(symbol.clone(), quantity, price));
            }
        }

        self.cash = round_cents(self.cash - cost);
        self.buying_power = round_cents(self.cash * self.margin_multiplier);
        Ok(FillOutcome { realized_pl: None })
    }

    fn apply_sell(
        &mut self,
        symbol: &Symbol,
        quantity: u32,
        price: f64,
    ) -> Result<FillOutcome, TradingError> {
        let (realized, remaining) = {
            let position = self.positions.get_mut(symbol).ok_or_else(|| {
                TradingError::PositionNotFound {
                    symbol: symbol.to_string(),
                }
            })?;
            if position.quantity < quantity {
                return Err(TradingError::PositionNotFound {
                    symbol: symbol.to_string(),
                });
            }

            let realized = round_cents((price - position.average_price) * quantity as f64);
            position.quantity -= quantity;
            if position.quantity > 0 {
                position.revalue(price);
            }
            (realized, position.quantity)
        };

        if remaining == 0 {
            self.positions.remove(symbol);
        }

        let proceeds = round_cents(price * quantity as f64);
        self.cash = round_cents(self.cash + proceeds);
        self.buying_power = round_cents(self.cash * self.margin_multiplier);
        Ok(FillOutcome {
            realized_pl: Some(realized),
        })
    }

    /// Refresh one position's derived valuation fields
    pub fn set_market_price(&mut self, symbol: &Symbol, price: f64) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.revalue(round_cents(price));
        }
    }

    /// Snapshot with recomputed aggregate valuation
    pub fn snapshot(&self) -> Portfolio {
        let mut positions: Vec<Position> = self.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.as_str().cmp(b.symbol.as_str()));

        let market_value: f64 = positions.iter().map(|p| p.market_value).sum();
        let total_value = round_cents(self.cash + market_value);
        let total_pl = round_cents(total_value - self.initial_cash);
        let total_pl_percent = if self.initial_cash > 0.0 {
            round_cents(total_pl / self.initial_cash * 100.0)
        } else {
            0.0
        };

        Portfolio {
            cash: self.cash,
            buying_power: self.buying_power,
            positions,
            total_value,
            total_pl,
            total_pl_percent,
        }
    }

    /// Restore the ledger to a clean slate
    pub fn reset(&mut self, new_cash: Option<f64>) {
        let cash = round_cents(new_cash.unwrap_or(self.initial_cash));
        self.initial_cash = cash;
        self.cash = cash;
        self.buying_power = round_cents(cash * self.margin_multiplier);
        self.positions.clear();
    }
}
