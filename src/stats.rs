use crate::types::{SummaryStats, TradeRecord};

/// Assumed average fee per trade, as a fraction of notional.
pub const ESTIMATED_FEE_RATE: f64 = 0.0005;

/// Aggregate a trade list into summary metrics.
///
/// Volume covers every trade; win rate and net pnl cover only closed trades
/// that carry a pnl. An empty list yields the zero baseline.
pub fn compute_stats(trades: &[TradeRecord]) -> SummaryStats {
    if trades.is_empty() {
        return SummaryStats::default();
    }

    let mut closed = 0usize;
    let mut wins = 0usize;
    let mut net_pnl = 0.0;
    for pnl in trades.iter().filter_map(TradeRecord::realized_pnl) {
        closed += 1;
        if pnl > 0.0 {
            wins += 1;
        }
        net_pnl += pnl;
    }

    let volume = trades.iter().map(TradeRecord::notional).sum();
    let win_rate = if closed > 0 {
        (wins as f64 / closed as f64) * 100.0
    } else {
        0.0
    };

    SummaryStats {
        total_trades: trades.len(),
        win_rate,
        volume,
        net_pnl,
        estimated_fees: volume * ESTIMATED_FEE_RATE,
    }
}

/// Cumulative realized pnl as `(timestamp, equity)` points, one per trade
/// that realized a pnl. Expects `trades` in ascending time order.
pub fn equity_curve(trades: &[TradeRecord]) -> Vec<(i64, f64)> {
    let mut equity = 0.0;
    trades
        .iter()
        .filter_map(|t| {
            let pnl = t.realized_pnl()?;
            equity += pnl;
            Some((t.timestamp, equity))
        })
        .collect()
}
