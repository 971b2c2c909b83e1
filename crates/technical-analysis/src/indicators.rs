use analysis_core::{Bar, TechnicalIndicatorSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Floor for the average loss so a window with no down moves yields RSI ~100.
const RSI_LOSS_EPSILON: f64 = 1e-10;

/// Rolling mean with a minimum period of one.
///
/// Row `i` averages the last `window` values ending at `i`, or every value so far
/// while fewer than `window` rows exist. Output has the same length as `data`.
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len());
    let mut sum = 0.0;
    for i in 0..data.len() {
        sum += data[i];
        if i >= window {
            sum -= data[i - window];
        }
        let count = (i + 1).min(window);
        result.push(sum / count as f64);
    }
    result
}

/// Relative Strength Index from simple rolling averages of gains and losses.
///
/// The first row contributes a zero change, so the series is the same length as
/// `closes`. An average loss of exactly zero is replaced by a tiny epsilon, so a
/// window with no losses reads near 100 when it has gains and 0 when it has none.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.is_empty() {
        return vec![];
    }

    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(0.0);
    losses.push(0.0);
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = rolling_mean(&gains, period);
    let avg_losses = rolling_mean(&losses, period);

    avg_gains
        .iter()
        .zip(avg_losses.iter())
        .map(|(&gain, &loss)| {
            let loss = if loss == 0.0 { RSI_LOSS_EPSILON } else { loss };
            let rs = gain / loss;
            100.0 - (100.0 / (1.0 + rs))
        })
        .collect()
}

/// Percent distance of `value` from `baseline`; zero when the baseline is zero.
fn pct_vs(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        (value / baseline - 1.0) * 100.0
    }
}

/// One bar augmented with its indicator values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub volume: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub rsi: f64,
    pub volume_sma_20: f64,
    pub price_vs_sma50: f64,
    pub price_vs_sma200: f64,
    pub volume_trend: f64,
}

/// Derives moving averages, RSI and volume trend from ascending daily bars.
#[derive(Debug, Clone)]
pub struct IndicatorCalculator {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub volume_window: usize,
}

impl IndicatorCalculator {
    pub fn new() -> Self {
        Self {
            short_window: 50,
            long_window: 200,
            rsi_period: 14,
            volume_window: 20,
        }
    }

    /// Per-row indicator series. Every row carries a value, including the first.
    pub fn calculate(&self, bars: &[Bar]) -> Vec<IndicatorRow> {
        if bars.is_empty() {
            return vec![];
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let sma_short = rolling_mean(&closes, self.short_window);
        let sma_long = rolling_mean(&closes, self.long_window);
        let rsi_values = rsi(&closes, self.rsi_period);
        let volume_sma = rolling_mean(&volumes, self.volume_window);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| IndicatorRow {
                timestamp: bar.timestamp,
                close: bar.close,
                volume: bar.volume,
                sma_50: sma_short[i],
                sma_200: sma_long[i],
                rsi: rsi_values[i],
                volume_sma_20: volume_sma[i],
                price_vs_sma50: pct_vs(bar.close, sma_short[i]),
                price_vs_sma200: pct_vs(bar.close, sma_long[i]),
                volume_trend: pct_vs(bar.volume, volume_sma[i]),
            })
            .collect()
    }

    /// Readings from the final row, or the neutral set for an empty series.
    pub fn latest(&self, rows: &[IndicatorRow]) -> TechnicalIndicatorSet {
        match rows.last() {
            Some(row) => TechnicalIndicatorSet {
                price: row.close,
                sma_50: row.sma_50,
                sma_200: row.sma_200,
                rsi: row.rsi,
                volume: row.volume,
                volume_sma_20: row.volume_sma_20,
                price_vs_sma50: row.price_vs_sma50,
                price_vs_sma200: row.price_vs_sma200,
                volume_trend: row.volume_trend,
            },
            None => TechnicalIndicatorSet::neutral(),
        }
    }

    /// `calculate` followed by `latest`.
    pub fn latest_from_bars(&self, bars: &[Bar]) -> TechnicalIndicatorSet {
        self.latest(&self.calculate(bars))
    }
}

impl Default for IndicatorCalculator {
    fn default() -> Self {
        Self::new()
    }
}
