//! Scripted paper trading demo session
//!
//! Runs a short buy/rest/sweep/sell sequence against the in-memory price
//! table and prints the resulting portfolio and audit trail.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use papertrader::{EngineConfig, OrderRequest, Side, StaticPriceSource, Symbol, TradingEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    info!("🚀 Starting paper trading demo session");

    let prices = Arc::new(StaticPriceSource::with_default_quotes());
    let engine = TradingEngine::new(EngineConfig::default(), prices.clone());

    let sizing = engine.calculate_position_size("AAPL", 1000.0, 5.0).await?;
    info!(
        "AAPL sizing: {} shares suggested (max {}), stop at {:.2}, max loss {:.2}",
        sizing.suggested_shares, sizing.max_shares, sizing.stop_loss_price, sizing.max_loss
    );

    let buy = engine
        .submit_order(OrderRequest::market("AAPL", Side::Buy, 100))
        .await?;
    info!(
        "Bought {} AAPL @ {:.2}",
        buy.filled_quantity.unwrap_or_default(),
        buy.filled_price.unwrap_or_default()
    );

    let resting = engine
        .submit_order(OrderRequest::limit("MSFT", Side::Buy, 10, 370.00))
        .await?;
    info!("Resting limit order {} for 10 MSFT @ 370.00", resting.id);

    // Market moves and the resting limit becomes marketable.
    prices.set_price(Symbol::new("MSFT"), 369.40);
    let filled = engine.check_pending_orders().await;
    info!("Pending sweep filled {} order(s)", filled.len());

    prices.set_price(Symbol::new("AAPL"), 185.00);
    engine
        .submit_order(OrderRequest::market("AAPL", Side::Sell, 100))
        .await?;

    let portfolio = engine.get_portfolio().await?;
    info!(
        "Portfolio: cash {:.2}, buying power {:.2}, total value {:.2} ({:+.2}%)",
        portfolio.cash, portfolio.buying_power, portfolio.total_value, portfolio.total_pl_percent
    );
    for position in &portfolio.positions {
        info!(
            "  {} x{} @ {:.2} avg, unrealized {:+.2}",
            position.symbol, position.quantity, position.average_price, position.unrealized_pl
        );
    }

    info!("Audit trail:");
    for entry in engine.get_audit_log() {
        let symbol = entry
            .symbol
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        info!(
            "  {} {} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.action,
            symbol
        );
    }

    Ok(())
}
