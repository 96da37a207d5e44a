//! Trading engine: order lifecycle management over the portfolio ledger

use super::audit::{AuditAction, AuditEntry, AuditLog};
use super::errors::TradingError;
use super::ledger::{round_cents, PortfolioLedger};
use super::sizing;
use super::types::{
    Order, OrderRequest, OrderStatus, OrderType, Portfolio, Position, PositionSizingResult, Side,
    TradingMode,
};
use crate::market::{PriceSource, Symbol};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub initial_cash: f64,
    pub margin_multiplier: f64,
    pub max_audit_entries: usize,
    pub mode: TradingMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            margin_multiplier: 2.0,
            max_audit_entries: 1000,
            mode: TradingMode::Paper,
        }
    }
}

struct EngineState {
    ledger: PortfolioLedger,
    orders: Vec<Order>,
    audit: AuditLog,
}

/// Paper trading engine
///
/// Owns the portfolio ledger, all orders, and the audit log for its
/// lifetime. Every mutating operation serializes behind `write_gate`
/// from price resolution through fill application, so two concurrent
/// submissions can never both pass a stale buying-power check. State
/// access inside the gate uses short lock sections that never span an
/// await, keeping read-only queries responsive while a price call is
/// in flight.
pub struct TradingEngine {
    config: EngineConfig,
    price_source: Arc<dyn PriceSource>,
    state: RwLock<EngineState>,
    write_gate: Mutex<()>,
}

impl TradingEngine {
    pub fn new(config: EngineConfig, price_source: Arc<dyn PriceSource>) -> Self {
        info!(
            "trading engine initialized: cash {:.2}, margin {}x, mode {}",
            config.initial_cash, config.margin_multiplier, config.mode
        );
        Self {
            state: RwLock::new(EngineState {
                ledger: PortfolioLedger::new(config.initial_cash, config.margin_multiplier),
                orders: Vec::new(),
                audit: AuditLog::new(config.max_audit_entries),
            }),
            price_source,
            config,
            write_gate: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> TradingMode {
        self.config.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Submit an order request
    ///
    /// Validates the request against the current ledger, stores a pending
    /// order, and logs `order.placed`. Market orders, and limit orders the
    /// reference price already satisfies, fill before this call returns.
    /// A rejected submission stores no order and writes no audit entry.
    ///
    /// A limit or stop-limit request without a limit price is costed at
    /// the reference price instead, so a priceless limit order is
    /// immediately marketable.
    pub async fn submit_order(&self, request: OrderRequest) -> Result<Order, TradingError> {
        if request.quantity == 0 {
            return Err(TradingError::InvalidQuantity);
        }
        let symbol = Symbol::new(&request.symbol);

        let _gate = self.write_gate.lock().await;
        let reference_price = self.price_source.current_price(&symbol).await?;

        // Limit and stop-limit orders are costed at their limit price,
        // everything else at the reference price.
        let candidate_price = match request.order_type {
            OrderType::Limit | OrderType::StopLimit => {
                request.limit_price.unwrap_or(reference_price)
            }
            OrderType::Market | OrderType::Stop => reference_price,
        };

        {
            let state = self.state.read();
            match request.side {
                Side::Buy => {
                    let required = round_cents(candidate_price * request.quantity as f64);
                    let available = state.ledger.buying_power();
                    if required > available {
                        return Err(TradingError::InsufficientFunds {
                            required,
                            available,
                        });
                    }
                }
                Side::Sell => {
                    let held = state.ledger.position(&symbol).map_or(0, |p| p.quantity);
                    if held < request.quantity {
                        return Err(TradingError::PositionNotFound {
                            symbol: symbol.to_string(),
                        });
                    }
                }
            }
        }

        let order = Order::new(symbol, &request, self.config.mode);
        debug!(
            "order accepted: {} {} {} x{} ({})",
            order.id, order.side, order.symbol, order.quantity, order.order_type
        );

        let fills_now = match request.order_type {
            OrderType::Market => true,
            OrderType::Limit => limit_satisfied(request.side, reference_price, candidate_price),
            OrderType::Stop | OrderType::StopLimit => false,
        };

        let mut guard = self.state.write();
        let state = &mut *guard;
        state.orders.push(order.clone());
        state.audit.append(
            AuditEntry::for_order(AuditAction::OrderPlaced, &order)
                .with_price(round_cents(candidate_price)),
        );

        if fills_now {
            Self::execute_fill(state, &order.id, candidate_price)
        } else {
            Ok(order)
        }
    }

    /// Fill a pending order at the supplied price, or at a freshly
    /// resolved reference price when none is given
    pub async fn fill_order(
        &self,
        order_id: &str,
        fill_price: Option<f64>,
    ) -> Result<Order, TradingError> {
        let _gate = self.write_gate.lock().await;

        let (symbol, status) = {
            let state = self.state.read();
            let order = state
                .orders
                .iter()
                .find(|o| o.id == order_id)
                .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;
            (order.symbol.clone(), order.status)
        };
        if status != OrderStatus::Pending {
            return Err(TradingError::InvalidState {
                id: order_id.to_string(),
                status,
            });
        }

        let price = match fill_price {
            Some(price) => price,
            None => self.price_source.current_price(&symbol).await?,
        };

        let mut guard = self.state.write();
        Self::execute_fill(&mut guard, order_id, price)
    }

    /// Cancel a pending order; no ledger effect
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order, TradingError> {
        let _gate = self.write_gate.lock().await;
        let mut guard = self.state.write();
        let state = &mut *guard;

        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;
        if order.status != OrderStatus::Pending {
            return Err(TradingError::InvalidState {
                id: order.id.clone(),
                status: order.status,
            });
        }

        order.status = OrderStatus::Cancelled;
        let mut entry = AuditEntry::for_order(AuditAction::OrderCancelled, order);
        if let Some(limit_price) = order.limit_price {
            entry = entry.with_price(limit_price);
        }
        let cancelled = order.clone();
        state.audit.append(entry);

        info!("order cancelled: {}", cancelled.id);
        Ok(cancelled)
    }

    /// Sweep pending orders against fresh prices, filling any whose
    /// trigger condition holds
    ///
    /// This is the external fill trigger for resting limit/stop orders,
    /// typically driven by a periodic timer. A symbol whose price cannot
    /// be resolved is skipped, not fatal; an order whose fill is refused
    /// by the ledger stays pending.
    pub async fn check_pending_orders(&self) -> Vec<Order> {
        let _gate = self.write_gate.lock().await;

        let pending: Vec<(String, Symbol)> = self
            .state
            .read()
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .map(|o| (o.id.clone(), o.symbol.clone()))
            .collect();

        let mut filled = Vec::new();
        for (order_id, symbol) in pending {
            let reference_price = match self.price_source.current_price(&symbol).await {
                Ok(price) => price,
                Err(err) => {
                    warn!("skipping pending order {}: no price for {}: {}", order_id, symbol, err);
                    continue;
                }
            };

            let mut guard = self.state.write();
            let state = &mut *guard;
            let execution_price = state
                .orders
                .iter()
                .find(|o| o.id == order_id && o.status == OrderStatus::Pending)
                .and_then(|o| trigger_price(o, reference_price));

            if let Some(execution_price) = execution_price {
                match Self::execute_fill(state, &order_id, execution_price) {
                    Ok(order) => filled.push(order),
                    Err(err) => warn!("pending order {} not fillable: {}", order_id, err),
                }
            }
        }
        filled
    }

    /// Portfolio snapshot with freshly resolved market prices
    pub async fn get_portfolio(&self) -> Result<Portfolio, TradingError> {
        self.refresh_market_prices().await?;
        Ok(self.state.read().ledger.snapshot())
    }

    /// Re-resolve prices for every open position and update valuations
    ///
    /// Display-only: touches no cash and writes no audit entry.
    pub async fn refresh_market_prices(&self) -> Result<(), TradingError> {
        let symbols = self.state.read().ledger.open_symbols();
        let mut fresh = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let price = self.price_source.current_price(&symbol).await?;
            fresh.push((symbol, price));
        }

        let mut guard = self.state.write();
        for (symbol, price) in fresh {
            guard.ledger.set_market_price(&symbol, price);
        }
        Ok(())
    }

    /// Total account value (cash plus position market values)
    pub async fn account_value(&self) -> Result<f64, TradingError> {
        Ok(self.get_portfolio().await?.total_value)
    }

    /// Suggested share count for a risk budget, bounded by buying power
    pub async fn calculate_position_size(
        &self,
        symbol: &str,
        risk_amount: f64,
        stop_loss_percent: f64,
    ) -> Result<PositionSizingResult, TradingError> {
        let symbol = Symbol::new(symbol);
        let current_price = self.price_source.current_price(&symbol).await?;
        let buying_power = self.state.read().ledger.buying_power();
        Ok(sizing::size_position(
            current_price,
            risk_amount,
            stop_loss_percent,
            buying_power,
        ))
    }

    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        self.state
            .read()
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
    }

    pub fn get_orders(&self) -> Vec<Order> {
        self.state.read().orders.clone()
    }

    /// Orders in submission order, optionally filtered by symbol
    pub fn get_order_history(&self, symbol: Option<&str>) -> Vec<Order> {
        let state = self.state.read();
        match symbol {
            Some(symbol) => {
                let symbol = Symbol::new(symbol);
                state
                    .orders
                    .iter()
                    .filter(|o| o.symbol == symbol)
                    .cloned()
                    .collect()
            }
            None => state.orders.clone(),
        }
    }

    pub fn get_position(&self, symbol: &str) -> Option<Position> {
        self.state
            .read()
            .ledger
            .position(&Symbol::new(symbol))
            .cloned()
    }

    /// Audit entries in chronological order, oldest first
    pub fn get_audit_log(&self) -> Vec<AuditEntry> {
        self.state.read().audit.snapshot()
    }

    /// Clear all orders, positions, and audit history, restoring cash to
    /// `new_cash` (or the original initial cash)
    pub async fn reset(&self, new_cash: Option<f64>) {
        let _gate = self.write_gate.lock().await;
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.ledger.reset(new_cash);
        state.orders.clear();
        state.audit.clear();

        let cash = state.ledger.cash();
        state.audit.append(
            AuditEntry::new(AuditAction::AccountReset, self.config.mode)
                .with_metadata(json!({ "new_cash": cash })),
        );
        info!("account reset: cash {:.2}", cash);
    }

    /// Apply a fill to a pending order and the ledger as one unit
    ///
    /// Caller must hold the write gate. If the ledger refuses the trade
    /// the order stays pending and nothing is logged.
    fn execute_fill(
        state: &mut EngineState,
        order_id: &str,
        price: f64,
    ) -> Result<Order, TradingError> {
        let price = round_cents(price);
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;
        if order.status != OrderStatus::Pending {
            return Err(TradingError::InvalidState {
                id: order.id.clone(),
                status: order.status,
            });
        }

        let outcome = state
            .ledger
            .apply_fill(&order.symbol, order.side, order.quantity, price)?;

        order.status = OrderStatus::Filled;
        order.filled_price = Some(price);
        order.filled_quantity = Some(order.quantity);
        order.filled_at = Some(Utc::now());

        let mut entry =
            AuditEntry::for_order(AuditAction::OrderFilled, order).with_price(price);
        if let Some(realized_pl) = outcome.realized_pl {
            entry = entry.with_metadata(json!({ "realized_pl": realized_pl }));
        }
        let filled = order.clone();
        state.audit.append(entry);

        info!(
            "order filled: {} {} {} x{} @ {:.2}",
            filled.id, filled.side, filled.symbol, filled.quantity, price
        );
        Ok(filled)
    }
}

fn limit_satisfied(side: Side, reference: f64, limit: f64) -> bool {
    match side {
        Side::Buy => reference <= limit,
        Side::Sell => reference >= limit,
    }
}

fn stop_crossed(side: Side, reference: f64, stop: f64) -> bool {
    match side {
        Side::Buy => reference >= stop,
        Side::Sell => reference <= stop,
    }
}

/// Execution price for a resting order, if its trigger condition holds
fn trigger_price(order: &Order, reference_price: f64) -> Option<f64> {
    match order.order_type {
        OrderType::Market => Some(reference_price),
        OrderType::Limit => {
            let limit = order.limit_price?;
            limit_satisfied(order.side, reference_price, limit).then_some(limit)
        }
        OrderType::Stop => {
            let stop = order.stop_price?;
            stop_crossed(order.side, reference_price, stop).then_some(reference_price)
        }
        OrderType::StopLimit => {
            let stop = order.stop_price?;
            let limit = order.limit_price?;
            (stop_crossed(order.side, reference_price, stop)
                && limit_satisfied(order.side, reference_price, limit))
            .then_some(limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticPriceSource;

    fn engine() -> (TradingEngine, Arc<StaticPriceSource>) {
        let source = Arc::new(StaticPriceSource::with_default_quotes());
        let engine = TradingEngine::new(EngineConfig::default(), source.clone());
        (engine, source)
    }

    #[tokio::test]
    async fn test_market_buy_fills_immediately() {
        let (engine, _) = engine();

        let order = engine
            .submit_order(OrderRequest::market("aapl", Side::Buy, 100))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.symbol.as_str(), "AAPL");
        assert_eq!(order.filled_price, Some(178.72));
        assert_eq!(order.filled_quantity, Some(100));
        assert!(order.filled_at.is_some());

        let portfolio = engine.get_portfolio().await.unwrap();
        assert_eq!(portfolio.cash, 82128.0);
        assert_eq!(portfolio.buying_power, 164256.0);

        let position = engine.get_position("AAPL").unwrap();
        assert_eq!(position.quantity, 100);
        assert_eq!(position.average_price, 178.72);

        let audit = engine.get_audit_log();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].action, AuditAction::OrderPlaced);
        assert_eq!(audit[1].action, AuditAction::OrderFilled);
    }

    #[tokio::test]
    async fn test_full_round_trip_scenario() {
        let (engine, source) = engine();

        engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 100))
            .await
            .unwrap();

        // A buy limit above the market fills immediately at the limit.
        let order = engine
            .submit_order(OrderRequest::limit("AAPL", Side::Buy, 50, 180.00))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_price, Some(180.00));

        let position = engine.get_position("AAPL").unwrap();
        assert_eq!(position.quantity, 150);
        assert_eq!(position.average_price, 179.15);

        source.set_price(Symbol::new("AAPL"), 185.00);
        let cash_before = engine.get_portfolio().await.unwrap().cash;
        engine
            .submit_order(OrderRequest::market("AAPL", Side::Sell, 150))
            .await
            .unwrap();

        let portfolio = engine.get_portfolio().await.unwrap();
        assert_eq!(portfolio.cash, round_cents(cash_before + 27750.0));
        assert_eq!(portfolio.cash, 100878.0);
        assert!(portfolio.positions.is_empty());
        assert!(engine.get_position("AAPL").is_none());
        assert_eq!(engine.account_value().await.unwrap(), 100878.0);

        let audit = engine.get_audit_log();
        let actions: Vec<AuditAction> = audit.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::OrderPlaced,
                AuditAction::OrderFilled,
                AuditAction::OrderPlaced,
                AuditAction::OrderFilled,
                AuditAction::OrderPlaced,
                AuditAction::OrderFilled,
            ]
        );

        // Realized P/L survives in the sell fill's audit metadata.
        let metadata = audit[5].metadata.as_ref().unwrap();
        assert_eq!(
            metadata["realized_pl"].as_f64().unwrap(),
            round_cents((185.00 - 179.15) * 150.0)
        );
    }

    #[tokio::test]
    async fn test_limit_buy_below_market_rests_until_triggered() {
        let (engine, source) = engine();

        let order = engine
            .submit_order(OrderRequest::limit("AAPL", Side::Buy, 10, 170.00))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.filled_price.is_none());

        // Still above the limit: nothing fills.
        assert!(engine.check_pending_orders().await.is_empty());

        source.set_price(Symbol::new("AAPL"), 169.50);
        let filled = engine.check_pending_orders().await;
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].id, order.id);
        assert_eq!(filled[0].filled_price, Some(170.00));

        let position = engine.get_position("AAPL").unwrap();
        assert_eq!(position.quantity, 10);
    }

    #[tokio::test]
    async fn test_stop_sell_triggers_at_reference_price() {
        let (engine, source) = engine();
        engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 100))
            .await
            .unwrap();

        let order = engine
            .submit_order(OrderRequest::stop("AAPL", Side::Sell, 100, 175.00))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        source.set_price(Symbol::new("AAPL"), 174.20);
        let filled = engine.check_pending_orders().await;
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].filled_price, Some(174.20));
        assert!(engine.get_position("AAPL").is_none());
    }

    #[tokio::test]
    async fn test_stop_limit_sell_fills_at_limit_once_stop_crossed() {
        let (engine, source) = engine();
        engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 100))
            .await
            .unwrap();

        let order = engine
            .submit_order(OrderRequest::stop_limit("AAPL", Side::Sell, 100, 175.00, 174.00))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        // Above the stop: untriggered.
        assert!(engine.check_pending_orders().await.is_empty());

        // Between stop and limit: triggered, executes at the limit price.
        source.set_price(Symbol::new("AAPL"), 174.50);
        let filled = engine.check_pending_orders().await;
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].id, order.id);
        assert_eq!(filled[0].filled_price, Some(174.00));
        assert!(engine.get_position("AAPL").is_none());
    }

    #[tokio::test]
    async fn test_fill_order_with_explicit_price() {
        let (engine, _) = engine();

        let order = engine
            .submit_order(OrderRequest::limit("MSFT", Side::Buy, 5, 370.00))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let filled = engine.fill_order(&order.id, Some(369.10)).await.unwrap();
        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(filled.filled_price, Some(369.10));
    }

    #[tokio::test]
    async fn test_fill_unknown_order() {
        let (engine, _) = engine();
        let err = engine.fill_order("ORD_missing", None).await.unwrap_err();
        assert!(matches!(err, TradingError::OrderNotFound(id) if id == "ORD_missing"));
    }

    #[tokio::test]
    async fn test_cancel_pending_then_cancel_again() {
        let (engine, _) = engine();

        let order = engine
            .submit_order(OrderRequest::limit("AAPL", Side::Buy, 10, 170.00))
            .await
            .unwrap();

        let cancelled = engine.cancel_order(&order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let audit = engine.get_audit_log();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[1].action, AuditAction::OrderCancelled);
        assert_eq!(audit[1].price, Some(170.00));

        let err = engine.cancel_order(&order.id).await.unwrap_err();
        assert!(matches!(
            err,
            TradingError::InvalidState { status: OrderStatus::Cancelled, .. }
        ));
        assert_eq!(engine.get_audit_log().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_filled_order_mutates_nothing() {
        let (engine, _) = engine();

        let order = engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 10))
            .await
            .unwrap();

        let err = engine.cancel_order(&order.id).await.unwrap_err();
        assert!(matches!(
            err,
            TradingError::InvalidState { status: OrderStatus::Filled, .. }
        ));
        assert_eq!(engine.get_order(&order.id).unwrap().status, OrderStatus::Filled);
        assert_eq!(engine.get_audit_log().len(), 2);
    }

    #[tokio::test]
    async fn test_sell_without_position_stores_nothing() {
        let (engine, _) = engine();

        let err = engine
            .submit_order(OrderRequest::market("TSLA", Side::Sell, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, TradingError::PositionNotFound { symbol } if symbol == "TSLA"));
        assert!(engine.get_orders().is_empty());
        assert!(engine.get_audit_log().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_state_unchanged() {
        let (engine, _) = engine();

        let err = engine
            .submit_order(OrderRequest::market("NVDA", Side::Buy, 10_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TradingError::InsufficientFunds { available, .. } if available == 200_000.0
        ));

        let portfolio = engine.get_portfolio().await.unwrap();
        assert_eq!(portfolio.cash, 100_000.0);
        assert_eq!(portfolio.buying_power, 200_000.0);
        assert!(engine.get_orders().is_empty());
        assert!(engine.get_audit_log().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (engine, _) = engine();
        let err = engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TradingError::InvalidQuantity));
        assert!(engine.get_orders().is_empty());
    }

    #[tokio::test]
    async fn test_oversell_rejected_at_submission() {
        let (engine, _) = engine();
        engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 10))
            .await
            .unwrap();

        let err = engine
            .submit_order(OrderRequest::market("AAPL", Side::Sell, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, TradingError::PositionNotFound { .. }));
        assert_eq!(engine.get_position("AAPL").unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_order_history_filter() {
        let (engine, _) = engine();
        engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 10))
            .await
            .unwrap();
        engine
            .submit_order(OrderRequest::market("MSFT", Side::Buy, 5))
            .await
            .unwrap();

        assert_eq!(engine.get_order_history(None).len(), 2);
        let aapl_only = engine.get_order_history(Some("aapl"));
        assert_eq!(aapl_only.len(), 1);
        assert_eq!(aapl_only[0].symbol.as_str(), "AAPL");
    }

    #[tokio::test]
    async fn test_position_size_uses_live_buying_power() {
        let (engine, _) = engine();

        let first = engine
            .calculate_position_size("AAPL", 1000.0, 5.0)
            .await
            .unwrap();
        let second = engine
            .calculate_position_size("AAPL", 1000.0, 5.0)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(first.suggested_shares <= first.max_shares);
        assert_eq!(first.max_shares, (200_000.0 / 178.72) as u64);
    }

    #[tokio::test]
    async fn test_reset_clears_everything_and_logs_once() {
        let (engine, _) = engine();
        engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 100))
            .await
            .unwrap();

        engine.reset(Some(50_000.0)).await;

        let portfolio = engine.get_portfolio().await.unwrap();
        assert_eq!(portfolio.cash, 50_000.0);
        assert_eq!(portfolio.buying_power, 100_000.0);
        assert!(portfolio.positions.is_empty());
        assert!(engine.get_orders().is_empty());

        let audit = engine.get_audit_log();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::AccountReset);
        assert_eq!(audit[0].metadata.as_ref().unwrap()["new_cash"], 50_000.0);
    }

    #[tokio::test]
    async fn test_market_price_refresh_updates_valuation_only() {
        let (engine, source) = engine();
        engine
            .submit_order(OrderRequest::market("AAPL", Side::Buy, 100))
            .await
            .unwrap();

        source.set_price(Symbol::new("AAPL"), 185.00);
        let portfolio = engine.get_portfolio().await.unwrap();

        assert_eq!(portfolio.cash, 82128.0);
        assert_eq!(portfolio.positions[0].current_price, 185.00);
        assert_eq!(portfolio.positions[0].unrealized_pl, 628.0);
        assert_eq!(portfolio.total_value, round_cents(82128.0 + 18500.0));
        // Valuation refresh is not an audited action.
        assert_eq!(engine.get_audit_log().len(), 2);
    }

    #[tokio::test]
    async fn test_pending_sweep_skips_symbols_without_prices() {
        let (engine, source) = engine();
        engine
            .submit_order(OrderRequest::limit("AAPL", Side::Buy, 10, 170.00))
            .await
            .unwrap();

        source.remove_price(&Symbol::new("AAPL"));
        assert!(engine.check_pending_orders().await.is_empty());
        assert_eq!(engine.get_orders()[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_pending_fill_refused_by_ledger_stays_pending() {
        let source = Arc::new(StaticPriceSource::with_default_quotes());
        let config = EngineConfig {
            initial_cash: 20_000.0,
            ..EngineConfig::default()
        };
        let engine = TradingEngine::new(config, source.clone());

        let resting = engine
            .submit_order(OrderRequest::limit("AAPL", Side::Buy, 100, 170.00))
            .await
            .unwrap();
        assert_eq!(resting.status, OrderStatus::Pending);

        // Spend most of the buying power while the limit order rests.
        engine
            .submit_order(OrderRequest::market("MSFT", Side::Buy, 50))
            .await
            .unwrap();
        let audit_len = engine.get_audit_log().len();

        // The limit triggers, but the ledger can no longer cover it.
        source.set_price(Symbol::new("AAPL"), 169.50);
        assert!(engine.check_pending_orders().await.is_empty());

        let order = engine.get_order(&resting.id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(engine.get_position("AAPL").is_none());
        assert_eq!(engine.get_audit_log().len(), audit_len);
    }

    #[tokio::test]
    async fn test_limit_without_price_is_marketable_at_reference() {
        let (engine, _) = engine();

        let request = OrderRequest {
            symbol: "AAPL".into(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            quantity: 10,
            limit_price: None,
            stop_price: None,
        };
        let order = engine.submit_order(request).await.unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_price, Some(178.72));
    }
}
