//! Market data access for the trading engine

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticker symbol, normalized to uppercase on construction
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for price feeds consumed by the engine
///
/// The engine assumes nothing beyond "given a symbol, return a current
/// price": every call may return a different value, and failures bubble
/// up to the caller unwrapped.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn current_price(&self, symbol: &Symbol) -> Result<f64>;
}

/// In-memory price table for demos and tests
pub struct StaticPriceSource {
    prices: DashMap<Symbol, f64>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self {
            prices: DashMap::new(),
        }
    }

    /// Price table seeded with a handful of large-cap quotes
    pub fn with_default_quotes() -> Self {
        let source = Self::new();
        for (symbol, price) in [
            ("AAPL", 178.72),
            ("MSFT", 378.91),
            ("GOOGL", 141.80),
            ("AMZN", 178.25),
            ("NVDA", 495.22),
            ("META", 505.67),
            ("TSLA", 248.50),
            ("JPM", 195.42),
        ] {
            source.set_price(Symbol::new(symbol), price);
        }
        source
    }

    pub fn set_price(&self, symbol: Symbol, price: f64) {
        self.prices.insert(symbol, price);
    }

    pub fn remove_price(&self, symbol: &Symbol) {
        self.prices.remove(symbol);
    }
}

impl Default for StaticPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn current_price(&self, symbol: &Symbol) -> Result<f64> {
        self.prices
            .get(symbol)
            .map(|p| *p)
            .ok_or_else(|| anyhow!("no quote available for {}", symbol))
    }
}
