//! Correctness tests for summary statistics and the demo generator.
//!
//! Feeds hand-built trade lists with known totals and asserts exact
//! aggregate values, then checks the shape of generated demo batches.

use std::collections::HashSet;

use deriverse_dashboard::generator::{DemoGenerator, ALTERNATE_SYMBOL, DEMO_BATCH_SIZE, PRIMARY_SYMBOL};
use deriverse_dashboard::stats::{compute_stats, equity_curve, ESTIMATED_FEE_RATE};
use deriverse_dashboard::types::*;

fn trade(id: &str, price: f64, size: f64, pnl: Option<f64>, ts: i64, status: TradeStatus) -> TradeRecord {
    TradeRecord {
        id: id.into(),
        symbol: "SOL-PERP".into(),
        side: Side::Long,
        kind: OrderKind::Market,
        price,
        size,
        pnl,
        timestamp: ts,
        status,
        valuation: Valuation::Reported,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Test 1: Zero Baseline ──
// No trades: every figure is zero, no division by zero.
#[test]
fn test_empty_stats_are_zero() {
    let stats = compute_stats(&[]);
    assert_eq!(stats, SummaryStats::default());
    assert_eq!(stats.total_trades, 0);
    assert_eq!(stats.win_rate, 0.0);
    assert!(equity_curve(&[]).is_empty());
}

// ── Test 2: Win Rate and Net PnL over Closed Trades ──
// Closed pnl [+10, -5, +20] and one open trade: 2 of 3 closed trades
// win and net pnl is 25. The open trade's pnl is ignored.
#[test]
fn test_win_rate_over_closed_only() {
    let trades = vec![
        trade("t1", 100.0, 2.0, Some(10.0), 1_000, TradeStatus::Closed),
        trade("t2", 50.0, 4.0, Some(-5.0), 2_000, TradeStatus::Closed),
        trade("t3", 10.0, 1.0, Some(20.0), 3_000, TradeStatus::Closed),
        trade("t4", 25.0, 8.0, Some(999.0), 4_000, TradeStatus::Open),
    ];

    let stats = compute_stats(&trades);
    assert_eq!(stats.total_trades, 4);
    assert!(close(stats.win_rate, 200.0 / 3.0), "win rate {}", stats.win_rate);
    assert!(close(stats.net_pnl, 25.0), "net pnl {}", stats.net_pnl);
    // 200 + 200 + 10 + 200
    assert!(close(stats.volume, 610.0), "volume {}", stats.volume);
}

// ── Test 3: Open Trades Count Toward Volume Only ──
#[test]
fn test_single_open_trade() {
    let trades = vec![trade("open", 100.0, 2.0, None, 1_000, TradeStatus::Open)];
    let stats = compute_stats(&trades);
    assert_eq!(stats.total_trades, 1);
    assert!(close(stats.volume, 200.0));
    assert_eq!(stats.win_rate, 0.0);
    assert_eq!(stats.net_pnl, 0.0);
}

// ── Test 4: Closed Trades Without PnL Are Excluded ──
// Live records are closed but carry no pnl; they must not drag the win
// rate down.
#[test]
fn test_closed_without_pnl_excluded() {
    let mut unvalued = trade("live", 0.0, 0.0, None, 1_000, TradeStatus::Closed);
    unvalued.valuation = Valuation::Unavailable;
    let trades = vec![unvalued, trade("t1", 10.0, 1.0, Some(5.0), 2_000, TradeStatus::Closed)];

    let stats = compute_stats(&trades);
    assert_eq!(stats.total_trades, 2);
    assert!(close(stats.win_rate, 100.0));
    assert!(close(stats.net_pnl, 5.0));
}

// ── Test 5: Zero PnL Is Not a Win; Liquidations Are Not Closed ──
#[test]
fn test_breakeven_and_liquidated() {
    let trades = vec![
        trade("flat", 10.0, 1.0, Some(0.0), 1_000, TradeStatus::Closed),
        trade("win", 10.0, 1.0, Some(10.0), 2_000, TradeStatus::Closed),
        trade("liq", 10.0, 1.0, Some(-500.0), 3_000, TradeStatus::Liquidated),
    ];
    let stats = compute_stats(&trades);
    assert!(close(stats.win_rate, 50.0));
    assert!(close(stats.net_pnl, 10.0));
    assert!(close(stats.volume, 30.0));
}

// ── Test 6: Stats Are Idempotent and Order-Independent ──
#[test]
fn test_stats_idempotent() {
    let trades = DemoGenerator::new().generate_at(1_700_000_000_000);
    let first = compute_stats(&trades);
    let second = compute_stats(&trades);
    assert_eq!(first, second);

    let mut reversed = trades.clone();
    reversed.reverse();
    let third = compute_stats(&reversed);
    assert_eq!(first.total_trades, third.total_trades);
    assert!(close(first.win_rate, third.win_rate));
    assert!((first.volume - third.volume).abs() < 1e-6);
    assert!((first.net_pnl - third.net_pnl).abs() < 1e-6);
}

// ── Test 7: Equity Curve Accumulates Realized PnL ──
#[test]
fn test_equity_curve_cumulative() {
    let trades = vec![
        trade("a", 1.0, 1.0, Some(10.0), 1_000, TradeStatus::Closed),
        trade("b", 1.0, 1.0, None, 2_000, TradeStatus::Open),
        trade("c", 1.0, 1.0, Some(-4.0), 3_000, TradeStatus::Closed),
    ];
    let curve = equity_curve(&trades);
    assert_eq!(curve.len(), 2);
    assert_eq!(curve[0].0, 1_000);
    assert!(close(curve[0].1, 10.0));
    assert_eq!(curve[1].0, 3_000);
    assert!(close(curve[1].1, 6.0));
}

// ── Test 8: Demo Batch Shape ──
// 15 closed synthetic trades, ascending, unique ids, newest stamped now.
#[test]
fn test_demo_batch_shape() {
    let now = 1_700_000_000_000;
    let trades = DemoGenerator::new().generate_at(now);

    assert_eq!(trades.len(), DEMO_BATCH_SIZE);
    assert!(trades.iter().all(|t| t.status == TradeStatus::Closed));
    assert!(trades.iter().all(|t| t.valuation == Valuation::Synthetic));
    assert!(trades.iter().all(|t| t.pnl.is_some()));
    assert!(trades.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(trades.last().map(|t| t.timestamp), Some(now));

    let ids: HashSet<&str> = trades.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids.len(), trades.len());
    assert!(trades.iter().all(|t| t.id.starts_with("demo-")));
}

// ── Test 9: Demo Value Ranges ──
#[test]
fn test_demo_value_ranges() {
    let (primary, base) = PRIMARY_SYMBOL;
    for _ in 0..20 {
        for t in DemoGenerator::new().generate_at(1_700_000_000_000) {
            assert!(t.symbol == primary || t.symbol == ALTERNATE_SYMBOL, "symbol {}", t.symbol);
            assert!(t.price >= base - 5.0 && t.price < base + 5.0, "price {}", t.price);
            assert!(t.size >= 1.0 && t.size < 21.0, "size {}", t.size);
            let pnl = t.pnl.unwrap_or(f64::NAN);
            assert!((-150.0..250.0).contains(&pnl), "pnl {pnl}");
        }
    }
}

// ── Test 10: Every Third Demo Trade Uses the Alternate Symbol ──
#[test]
fn test_demo_symbol_mix() {
    let trades = DemoGenerator::new().generate_at(1_700_000_000_000);
    let alternate = trades.iter().filter(|t| t.symbol == ALTERNATE_SYMBOL).count();
    assert_eq!(alternate, DEMO_BATCH_SIZE / 3);
}

// ── Test 11: Custom Batch Size ──
#[test]
fn test_custom_batch_size() {
    let generator = DemoGenerator { batch_size: 4 };
    assert_eq!(generator.generate_demo_trades().len(), 4);
    assert!(DemoGenerator { batch_size: 0 }.generate_demo_trades().is_empty());
}

// ── Test 12: Estimated Fees Follow Volume ──
// 0.05% of notional: volume 610 gives 0.305.
#[test]
fn test_estimated_fees() {
    let trades = vec![
        trade("t1", 100.0, 2.0, Some(10.0), 1_000, TradeStatus::Closed),
        trade("t2", 50.0, 4.0, Some(-5.0), 2_000, TradeStatus::Closed),
        trade("t3", 10.0, 1.0, Some(20.0), 3_000, TradeStatus::Closed),
        trade("t4", 25.0, 8.0, None, 4_000, TradeStatus::Open),
    ];
    let stats = compute_stats(&trades);
    assert!(close(stats.estimated_fees, 0.305), "fees {}", stats.estimated_fees);
    assert!(close(stats.estimated_fees, stats.volume * ESTIMATED_FEE_RATE));
    assert_eq!(compute_stats(&[]).estimated_fees, 0.0);
}
