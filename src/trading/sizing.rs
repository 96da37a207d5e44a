//! Risk-based position sizing

use super::ledger::round_cents;
use super::types::PositionSizingResult;

/// Informational risk/reward target reported with every suggestion.
/// Never enforced by the engine.
pub const RISK_REWARD_TARGET: f64 = 2.0;

/// Suggest a share count from a risk budget and stop-loss distance
///
/// Pure and deterministic: consumes nothing beyond its four inputs. The
/// suggestion is always capped by what buying power can carry, and a
/// non-positive stop-loss distance yields a zero-valued result rather
/// than dividing by zero.
pub fn size_position(
    current_price: f64,
    risk_amount: f64,
    stop_loss_percent: f64,
    buying_power: f64,
) -> PositionSizingResult {
    let stop_loss_price = current_price * (1.0 - stop_loss_percent / 100.0);
    let risk_per_share = current_price - stop_loss_price;

    if current_price <= 0.0 || risk_per_share <= 0.0 {
        return PositionSizingResult {
            suggested_shares: 0,
            max_shares: 0,
            risk_amount: 0.0,
            stop_loss_price: 0.0,
            max_loss: 0.0,
            risk_reward_ratio: 0.0,
        };
    }

    let suggested = (risk_amount / risk_per_share).floor().max(0.0) as u64;
    let max_shares = (buying_power / current_price).floor().max(0.0) as u64;
    let suggested_shares = suggested.min(max_shares);

    PositionSizingResult {
        suggested_shares,
        max_shares,
        risk_amount,
        stop_loss_price: round_cents(stop_loss_price),
        max_loss: round_cents(suggested_shares as f64 * risk_per_share),
        risk_reward_ratio: RISK_REWARD_TARGET,
    }
}
