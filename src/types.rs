use std::fmt;

use serde::Serialize;

// ── Trade Record ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderKind {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeStatus {
    Open,
    Closed,
    Filled,
    Liquidated,
}

/// Where the price/size/pnl of a record came from.
///
/// On-chain history cannot yet be decoded into fills, so live records carry
/// `Unavailable` with zeroed numbers rather than invented ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Valuation {
    /// Decoded from authoritative program state.
    Reported,
    /// Produced by the demo generator.
    Synthetic,
    /// Not derivable from the data that was fetched.
    Unavailable,
}

/// One observed or synthesized trading event. Never mutated after
/// construction; a state change is a new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub price: f64,
    pub size: f64,
    pub pnl: Option<f64>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub status: TradeStatus,
    pub valuation: Valuation,
}

impl TradeRecord {
    pub fn notional(&self) -> f64 {
        self.price * self.size
    }

    /// Realized PnL, present only for closed trades that carry one.
    pub fn realized_pnl(&self) -> Option<f64> {
        match self.status {
            TradeStatus::Closed => self.pnl,
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.pad("Long"),
            Side::Short => f.pad("Short"),
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeStatus::Open => "Open",
            TradeStatus::Closed => "Closed",
            TradeStatus::Filled => "Filled",
            TradeStatus::Liquidated => "Liquidated",
        };
        f.pad(s)
    }
}

/// Stable ascending sort by timestamp. Every producer of a trade list goes
/// through this before its output is exposed.
pub fn sort_by_timestamp(trades: &mut [TradeRecord]) {
    trades.sort_by_key(|t| t.timestamp);
}

// ── Derived views ──

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SummaryStats {
    pub total_trades: usize,
    /// Percentage of closed trades with positive pnl, 0-100.
    pub win_rate: f64,
    pub volume: f64,
    pub net_pnl: f64,
    /// Fees implied by volume at a flat assumed rate. Not reported by the
    /// program, so treat it like a `Valuation::Synthetic` figure.
    pub estimated_fees: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataSourceMode {
    Live,
    Demo,
}

/// Everything the view layer reads in one consistent snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub trades: Vec<TradeRecord>,
    pub stats: SummaryStats,
    /// Wallet balance in SOL.
    pub balance: f64,
    pub is_demo: bool,
    pub is_loading: bool,
}
