//! Deterministic synthetic price history.
//!
//! Closes follow a geometric random walk seeded from the ticker, so the same
//! ticker always yields the same series. Used when live data is disabled or
//! unavailable.

use analysis_core::{AnalysisError, Bar, HistoryPeriod, PriceSource};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use sha2::{Digest, Sha256};

const BASE_VOLUME: f64 = 1_000_000.0;
const MIN_PRICE: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct SyntheticPriceSource {
    pub start_price: f64,
    /// Daily drift (0.0001 = 0.01% per day)
    pub drift: f64,
    /// Daily volatility (0.02 = 2%)
    pub volatility: f64,
}

impl SyntheticPriceSource {
    pub fn new() -> Self {
        Self {
            start_price: 100.0,
            drift: 0.0001,
            volatility: 0.02,
        }
    }

    /// `days` daily bars ending on `end`, oldest first.
    pub fn generate(&self, ticker: &str, days: u32, end: NaiveDate) -> Result<Vec<Bar>, AnalysisError> {
        let mut rng = ChaCha8Rng::seed_from_u64(ticker_seed(ticker));
        let returns = Normal::new(self.drift, self.volatility)
            .map_err(|e| AnalysisError::InvalidInput(format!("bad return distribution: {}", e)))?;
        let volume_noise = LogNormal::new(0.0, 0.5)
            .map_err(|e| AnalysisError::CalculationError(format!("bad volume distribution: {}", e)))?;

        let mut closes = Vec::with_capacity(days as usize);
        let mut price = self.start_price;
        for i in 0..days {
            if i > 0 {
                let change = returns.sample(&mut rng);
                price = (price * (1.0 + change)).max(MIN_PRICE);
            }
            closes.push(price);
        }

        let first_day = end - Duration::days(i64::from(days.saturating_sub(1)));
        let bars = closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| {
                let daily_range = close * rng.gen_range(0.01..0.05);
                let high = close + rng.gen_range(0.0..daily_range);
                let low = close - rng.gen_range(0.0..daily_range);
                let open = low + rng.gen_range(0.0..=(high - low));
                let volume = (BASE_VOLUME * volume_noise.sample(&mut rng)).floor();
                let date = first_day + Duration::days(i as i64);

                Bar {
                    timestamp: date.and_time(NaiveTime::MIN).and_utc(),
                    open: round2(open),
                    high: round2(high),
                    low: round2(low),
                    close: round2(close),
                    volume,
                    vwap: None,
                }
            })
            .collect();

        Ok(bars)
    }
}

impl Default for SyntheticPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for SyntheticPriceSource {
    async fn fetch_history(&self, ticker: &str, period: HistoryPeriod) -> Result<Vec<Bar>, AnalysisError> {
        tracing::debug!("Generating {} days of synthetic prices for {}", period.days(), ticker);
        self.generate(ticker, period.days(), Utc::now().date_naive())
    }
}

/// First eight bytes of SHA-256(ticker), big-endian.
fn ticker_seed(ticker: &str) -> u64 {
    let digest = Sha256::digest(ticker.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_same_ticker_same_series() {
        let source = SyntheticPriceSource::new();
        let a = source.generate("ACME", 90, end()).unwrap();
        let b = source.generate("ACME", 90, end()).unwrap();
        let closes_a: Vec<f64> = a.iter().map(|b| b.close).collect();
        let closes_b: Vec<f64> = b.iter().map(|b| b.close).collect();
        assert_eq!(closes_a, closes_b);

        let other = source.generate("OTHER", 90, end()).unwrap();
        assert_ne!(closes_a, other.iter().map(|b| b.close).collect::<Vec<_>>());
    }

    #[test]
    fn test_shape_and_dates() {
        let bars = SyntheticPriceSource::new().generate("ACME", 30, end()).unwrap();
        assert_eq!(bars.len(), 30);
        assert_eq!(bars[0].close, 100.0);
        assert_eq!(bars[29].timestamp.date_naive(), end());
        assert_eq!(bars[0].timestamp.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        for pair in bars.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_ohlc_consistency() {
        let bars = SyntheticPriceSource::new().generate("ACME", 365, end()).unwrap();
        for bar in &bars {
            assert!(bar.close >= MIN_PRICE);
            assert!(bar.high >= bar.close);
            assert!(bar.low <= bar.close);
            assert!(bar.open >= bar.low && bar.open <= bar.high);
            assert!(bar.volume > 0.0);
        }
    }

    #[test]
    fn test_zero_days_is_empty() {
        let bars = SyntheticPriceSource::new().generate("ACME", 0, end()).unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_history_uses_period_length() {
        let bars = SyntheticPriceSource::new()
            .fetch_history("ACME", HistoryPeriod::ThreeMonths)
            .await
            .unwrap();
        assert_eq!(bars.len(), 90);
    }
}
