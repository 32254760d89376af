//! Chart overlays computed from candle closes.
//!
//! Every function returns a series aligned with its input; positions inside
//! the lookback window are `None`.

use serde::Serialize;

/// Simple moving average. Lookback: period - 1.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "SMA period must be >= 1");
    let mut result = vec![None; values.len()];
    if values.len() < period {
        return result;
    }
    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        result[i] = Some(sum / period as f64);
    }
    result
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values. Lookback: period - 1.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "EMA period must be >= 1");
    let mut result = vec![None; values.len()];
    if values.len() < period {
        return result;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = Some(prev);
    for i in period..values.len() {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = Some(prev);
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger bands: SMA +/- `mult` population standard deviations.
pub fn bollinger(values: &[f64], period: usize, mult: f64) -> Vec<Option<Bands>> {
    sma(values, period)
        .into_iter()
        .enumerate()
        .map(|(i, mid)| {
            let middle = mid?;
            let window = &values[i + 1 - period..=i];
            let var = window.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / period as f64;
            let dev = mult * var.sqrt();
            Some(Bands { upper: middle + dev, middle, lower: middle - dev })
        })
        .collect()
}

/// Relative strength index with Wilder smoothing. Lookback: period.
/// No losses gives 100, no gains gives 0, a flat window gives 50.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "RSI period must be >= 1");
    let n = values.len();
    let mut result = vec![None; n];
    if n < period + 1 {
        return result;
    }

    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
    for i in 1..=period {
        let ch = values[i] - values[i - 1];
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = Some(rsi_value(avg_gain, avg_loss));

    let p = period as f64;
    for i in (period + 1)..n {
        let ch = values[i] - values[i - 1];
        avg_gain = (avg_gain * (p - 1.0) + ch.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-ch).max(0.0)) / p;
        result[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line (fast EMA - slow EMA), its signal EMA, and the histogram.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<Option<Macd>> {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // Signal EMA runs over the defined part of the line only.
    let start = line.iter().position(Option::is_some).unwrap_or(line.len());
    let defined: Vec<f64> = line[start..].iter().flatten().copied().collect();
    let signal_ema = ema(&defined, signal);

    let mut result = vec![None; values.len()];
    for (offset, sig) in signal_ema.into_iter().enumerate() {
        if let (Some(sig), Some(l)) = (sig, line[start + offset]) {
            result[start + offset] = Some(Macd { line: l, signal: sig, histogram: l - sig });
        }
    }
    result
}
