use rand::Rng;

use crate::types::{sort_by_timestamp, OrderKind, Side, TradeRecord, TradeStatus, Valuation};

pub const PRIMARY_SYMBOL: (&str, f64) = ("SOL-PERP", 145.0);
pub const ALTERNATE_SYMBOL: &str = "BTC-PERP";

pub const DEMO_BATCH_SIZE: usize = 15;

const PRICE_BAND: f64 = 5.0;
const SIZE_RANGE: (f64, f64) = (1.0, 21.0);
const PNL_RANGE: (f64, f64) = (-150.0, 250.0);
const LONG_PROBABILITY: f64 = 0.6;
const LIMIT_PROBABILITY: f64 = 0.3;
const SPACING_MS: i64 = 8 * 60 * 60 * 1000;

/// Synthetic trade source for demo mode.
#[derive(Debug, Clone)]
pub struct DemoGenerator {
    pub batch_size: usize,
}

impl Default for DemoGenerator {
    fn default() -> Self {
        Self { batch_size: DEMO_BATCH_SIZE }
    }
}

impl DemoGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Generate one batch of closed trades ending at the current time.
    pub fn generate_demo_trades(&self) -> Vec<TradeRecord> {
        self.generate_at(Self::now_ms())
    }

    /// Generate a batch whose newest trade is stamped `now_ms`, spaced
    /// backwards at a fixed interval. Output is ascending by timestamp.
    pub fn generate_at(&self, now_ms: i64) -> Vec<TradeRecord> {
        let mut rng = rand::thread_rng();
        let (primary, base_price) = PRIMARY_SYMBOL;

        let mut trades: Vec<TradeRecord> = (0..self.batch_size)
            .map(|i| {
                let symbol = if i % 3 == 2 { ALTERNATE_SYMBOL } else { primary };
                let side = if rng.gen_bool(LONG_PROBABILITY) { Side::Long } else { Side::Short };
                let kind = if rng.gen_bool(LIMIT_PROBABILITY) { OrderKind::Limit } else { OrderKind::Market };
                let ts = now_ms - (i as i64) * SPACING_MS;

                TradeRecord {
                    id: format!("demo-{:02}-{:08x}", i, rng.gen::<u32>()),
                    symbol: symbol.to_string(),
                    side,
                    kind,
                    price: base_price + rng.gen_range(-PRICE_BAND..PRICE_BAND),
                    size: rng.gen_range(SIZE_RANGE.0..SIZE_RANGE.1),
                    pnl: Some(rng.gen_range(PNL_RANGE.0..PNL_RANGE.1)),
                    timestamp: ts,
                    status: TradeStatus::Closed,
                    valuation: Valuation::Synthetic,
                }
            })
            .collect();

        sort_by_timestamp(&mut trades);
        trades
    }
}
