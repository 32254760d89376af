//! Public market-data feed for the trading terminal: 24h ticker, candles
//! with indicator overlays, and order-book depth, polled on a fixed timer.
//!
//! Independent of the data source controller; it shares no state with it.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{DashboardError, Result};
use crate::indicators::{bollinger, ema, macd, rsi, sma, Bands, Macd};

pub const DEPTH_LIMIT: u32 = 15;
pub const DEFAULT_PERIOD: &str = "1 Day";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodConfig {
    pub interval: &'static str,
    pub limit: u32,
}

pub const PERIODS: &[(&str, PeriodConfig)] = &[
    ("1 Day", PeriodConfig { interval: "15m", limit: 96 }),
    ("7 Day", PeriodConfig { interval: "2h", limit: 84 }),
    ("30 Day", PeriodConfig { interval: "12h", limit: 60 }),
    ("1 Month", PeriodConfig { interval: "12h", limit: 60 }),
    ("3 Months", PeriodConfig { interval: "1d", limit: 90 }),
    ("6 Months", PeriodConfig { interval: "3d", limit: 60 }),
    ("1 Year", PeriodConfig { interval: "1w", limit: 52 }),
    ("5 Years", PeriodConfig { interval: "1M", limit: 60 }),
];

/// Candle interval and count for a chart period; unknown names map to one day.
pub fn period_config(period: &str) -> PeriodConfig {
    PERIODS
        .iter()
        .find(|(name, _)| *name == period)
        .or_else(|| PERIODS.iter().find(|(name, _)| *name == DEFAULT_PERIOD))
        .map(|(_, cfg)| *cfg)
        .unwrap_or(PeriodConfig { interval: "15m", limit: 96 })
}

// ── Output Types ──

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ticker {
    pub last_price: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub candle: Candle,
    pub sma20: Option<f64>,
    pub ema9: Option<f64>,
    pub bands: Option<Bands>,
    pub rsi14: Option<f64>,
    pub macd: Option<Macd>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
    /// Running size total from the best price outward.
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderBook {
    /// Highest price first, so the best ask sits next to the best bid.
    pub asks: Vec<BookLevel>,
    /// Best bid first.
    pub bids: Vec<BookLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub ticker: Ticker,
    pub chart: Vec<ChartPoint>,
    pub book: OrderBook,
    pub fetched_at_ms: i64,
}

// ── Wire types ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    last_price: String,
    price_change_percent: String,
}

#[derive(Debug, Deserialize)]
struct RawDepth {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

fn parse_num(s: &str) -> Result<f64> {
    s.parse().map_err(|_| DashboardError::Decode(format!("not a number: {s:?}")))
}

fn value_num(v: &Value) -> Result<f64> {
    match v {
        Value::String(s) => parse_num(s),
        Value::Number(n) => n.as_f64().ok_or_else(|| DashboardError::Decode(format!("bad number {n}"))),
        other => Err(DashboardError::Decode(format!("expected number, got {other}"))),
    }
}

fn parse_candle(row: &[Value]) -> Result<Candle> {
    if row.len() < 6 {
        return Err(DashboardError::Decode(format!("kline row has {} fields", row.len())));
    }
    Ok(Candle {
        open_time: row[0]
            .as_i64()
            .ok_or_else(|| DashboardError::Decode("kline open time".into()))?,
        open: value_num(&row[1])?,
        high: value_num(&row[2])?,
        low: value_num(&row[3])?,
        close: value_num(&row[4])?,
        volume: value_num(&row[5])?,
    })
}

/// Cumulative totals per side. Asks come back reversed.
fn build_book(raw: RawDepth) -> Result<OrderBook> {
    fn levels(rows: &[[String; 2]]) -> Result<Vec<BookLevel>> {
        let mut total = 0.0;
        rows.iter()
            .map(|[p, s]| {
                let size = parse_num(s)?;
                total += size;
                Ok(BookLevel { price: parse_num(p)?, size, total })
            })
            .collect()
    }
    let mut asks = levels(&raw.asks)?;
    asks.reverse();
    Ok(OrderBook { asks, bids: levels(&raw.bids)? })
}

/// Attach indicator overlays to a candle series.
pub fn build_chart(candles: Vec<Candle>) -> Vec<ChartPoint> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let sma20 = sma(&closes, 20);
    let ema9 = ema(&closes, 9);
    let bands = bollinger(&closes, 20, 2.0);
    let rsi14 = rsi(&closes, 14);
    let macd = macd(&closes, 12, 26, 9);

    candles
        .into_iter()
        .enumerate()
        .map(|(i, candle)| ChartPoint {
            candle,
            sma20: sma20[i],
            ema9: ema9[i],
            bands: bands[i],
            rsi14: rsi14[i],
            macd: macd[i],
        })
        .collect()
}

// ── Client ──

#[derive(Debug, Clone)]
pub struct MarketClient {
    http: Client,
    base_url: String,
}

impl MarketClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).header("Accept", "application/json").send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DashboardError::Http(format!("{status}: {text}")));
        }
        Ok(response.json().await?)
    }

    pub async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        let raw: RawTicker = self.get(&format!("/api/v3/ticker/24hr?symbol={symbol}")).await?;
        Ok(Ticker {
            last_price: parse_num(&raw.last_price)?,
            change_pct: parse_num(&raw.price_change_percent)?,
        })
    }

    pub async fn klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let rows: Vec<Vec<Value>> = self
            .get(&format!("/api/v3/klines?symbol={symbol}&interval={interval}&limit={limit}"))
            .await?;
        rows.iter().map(|r| parse_candle(r)).collect()
    }

    pub async fn depth(&self, symbol: &str, limit: u32) -> Result<OrderBook> {
        let raw: RawDepth = self.get(&format!("/api/v3/depth?symbol={symbol}&limit={limit}")).await?;
        build_book(raw)
    }

    /// Ticker, chart and book for `<asset>USDT` over the named period.
    pub async fn snapshot(&self, asset: &str, period: &str) -> Result<MarketSnapshot> {
        let symbol = format!("{asset}USDT");
        let cfg = period_config(period);

        let ticker = self.ticker(&symbol).await?;
        let candles = self.klines(&symbol, cfg.interval, cfg.limit).await?;
        let book = self.depth(&symbol, DEPTH_LIMIT).await?;

        Ok(MarketSnapshot {
            symbol,
            ticker,
            chart: build_chart(candles),
            book,
            fetched_at_ms: chrono::Utc::now().timestamp_millis(),
        })
    }
}

// ── Poller ──

/// Background poll loop. Starts fetching immediately, then every `interval`;
/// stops when [`MarketFeed::stop`] is called or the feed is dropped.
pub struct MarketFeed {
    rx: watch::Receiver<Option<MarketSnapshot>>,
    handle: JoinHandle<()>,
}

impl MarketFeed {
    pub fn start(client: MarketClient, asset: String, period: String, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match client.snapshot(&asset, &period).await {
                    Ok(snap) => {
                        tx.send_replace(Some(snap));
                    }
                    // Keep showing the previous snapshot.
                    Err(e) => tracing::warn!(error = %e, asset = %asset, "market poll failed"),
                }
            }
        });
        Self { rx, handle }
    }

    pub fn latest(&self) -> Option<MarketSnapshot> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<MarketSnapshot>> {
        self.rx.clone()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for MarketFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
