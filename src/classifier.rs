//! Heuristic trade classification from program log text.
//!
//! Isolated behind [`classify_logs`] so it can be swapped for real
//! instruction decoding without touching the fetcher or controller.

use crate::types::{Side, TradeStatus};

pub const LIQUIDATE_MARKER: &str = "Liquidate";
pub const CLOSE_MARKERS: &[&str] = &["ClosePosition", "Settle"];
pub const LONG_MARKER: &str = "Long";
pub const SHORT_MARKER: &str = "Short";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub side: Side,
    pub status: TradeStatus,
}

/// Classify a transaction from its log lines.
///
/// Status: any `Liquidate` line wins, then `ClosePosition`/`Settle` means
/// closed, otherwise open. Side: long if a `Long` line exists or no `Short`
/// line exists; ambiguity resolves to long.
pub fn classify_logs<S: AsRef<str>>(logs: &[S]) -> Classification {
    let any = |marker: &str| logs.iter().any(|l| l.as_ref().contains(marker));

    let status = if any(LIQUIDATE_MARKER) {
        TradeStatus::Liquidated
    } else if CLOSE_MARKERS.iter().any(|m| any(m)) {
        TradeStatus::Closed
    } else {
        TradeStatus::Open
    };

    let side = if any(LONG_MARKER) || !any(SHORT_MARKER) {
        Side::Long
    } else {
        Side::Short
    };

    Classification { side, status }
}
