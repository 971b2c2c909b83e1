use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub vwap: Option<f64>,
}

/// Named look-back window for price history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl HistoryPeriod {
    pub fn days(&self) -> u32 {
        match self {
            HistoryPeriod::OneMonth => 30,
            HistoryPeriod::ThreeMonths => 90,
            HistoryPeriod::SixMonths => 180,
            HistoryPeriod::OneYear => 365,
            HistoryPeriod::TwoYears => 730,
            HistoryPeriod::FiveYears => 1825,
        }
    }

    /// Range token understood by the chart endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::OneMonth => "1mo",
            HistoryPeriod::ThreeMonths => "3mo",
            HistoryPeriod::SixMonths => "6mo",
            HistoryPeriod::OneYear => "1y",
            HistoryPeriod::TwoYears => "2y",
            HistoryPeriod::FiveYears => "5y",
        }
    }
}

impl FromStr for HistoryPeriod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1mo" => Ok(HistoryPeriod::OneMonth),
            "3mo" => Ok(HistoryPeriod::ThreeMonths),
            "6mo" => Ok(HistoryPeriod::SixMonths),
            "1y" => Ok(HistoryPeriod::OneYear),
            "2y" => Ok(HistoryPeriod::TwoYears),
            "5y" => Ok(HistoryPeriod::FiveYears),
            other => Err(AnalysisError::InvalidInput(format!(
                "unknown history period '{}', expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y",
                other
            ))),
        }
    }
}

/// Fundamental ratios for one instrument.
///
/// Every field is optional. Scoring treats a missing ratio as "no opinion" and
/// substitutes a documented neutral value rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    // Valuation
    pub pe_ratio: Option<Decimal>,
    pub ev_ebitda: Option<Decimal>,
    pub peg_ratio: Option<Decimal>,
    pub pb_ratio: Option<Decimal>,
    pub ps_ratio: Option<Decimal>,

    // Profitability (percentages)
    pub roic: Option<Decimal>,
    pub roe: Option<Decimal>,
    pub gross_margin: Option<Decimal>,
    pub operating_margin: Option<Decimal>,
    pub net_margin: Option<Decimal>,

    // Balance sheet
    pub debt_equity: Option<Decimal>,
    pub current_ratio: Option<Decimal>,
    pub fcf_yield: Option<Decimal>,
    pub interest_coverage: Option<Decimal>,

    // Growth and income
    pub revenue_growth: Option<Decimal>,
    pub earnings_growth: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub payout_ratio: Option<Decimal>,
}

/// Convert an optional decimal ratio into the f64 domain used by the scorers.
pub fn ratio_f64(value: Option<Decimal>) -> Option<f64> {
    value.and_then(|d| d.to_f64())
}

/// Fundamentals joined with the identifying columns scoring needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentFundamentals {
    pub ticker: String,
    pub sector: Option<String>,
    pub fundamentals: Fundamentals,
}

/// Sector families that change how balance-sheet ratios are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectorClass {
    Standard,
    /// Banks and insurers run leveraged balance sheets by design.
    Financial,
    /// Capital-intensive, regulated borrowers.
    Utility,
}

impl SectorClass {
    pub fn from_sector(sector: Option<&str>) -> Self {
        match sector {
            Some("Financial Services") | Some("Banks") => SectorClass::Financial,
            Some("Utilities") => SectorClass::Utility,
            _ => SectorClass::Standard,
        }
    }
}

/// Discrete recommendation derived solely from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl Signal {
    pub fn from_total_score(total: f64) -> Self {
        match total {
            t if t >= 90.0 => Signal::StrongBuy,
            t if t >= 75.0 => Signal::Buy,
            t if t >= 50.0 => Signal::Hold,
            t if t >= 25.0 => Signal::Sell,
            _ => Signal::StrongSell,
        }
    }

    /// Stable identifier used for storage and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::StrongBuy => "STRONG_BUY",
            Signal::Buy => "BUY",
            Signal::Hold => "HOLD",
            Signal::Sell => "SELL",
            Signal::StrongSell => "STRONG_SELL",
        }
    }

    /// Human-readable label for the signal
    pub fn to_label(&self) -> &'static str {
        match self {
            Signal::StrongBuy => "Strong Buy",
            Signal::Buy => "Buy",
            Signal::Hold => "Hold",
            Signal::Sell => "Sell",
            Signal::StrongSell => "Strong Sell",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STRONG_BUY" => Ok(Signal::StrongBuy),
            "BUY" => Ok(Signal::Buy),
            "HOLD" => Ok(Signal::Hold),
            "SELL" => Ok(Signal::Sell),
            "STRONG_SELL" => Ok(Signal::StrongSell),
            other => Err(AnalysisError::InvalidInput(format!("unknown signal '{}'", other))),
        }
    }
}

/// Per-sector averages used as the denominator of the vs-sector ratios.
///
/// `None` means no instrument in the sector had an eligible value; scorers fall
/// back to absolute defaults in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorBenchmark {
    pub sector: String,
    pub avg_pe: Option<f64>,
    pub avg_ev_ebitda: Option<f64>,
    pub avg_roic: Option<f64>,
    pub avg_roe: Option<f64>,
    pub avg_debt_equity: Option<f64>,
    pub avg_gross_margin: Option<f64>,
    pub avg_operating_margin: Option<f64>,
    pub avg_net_margin: Option<f64>,
    pub stock_count: usize,
}

/// Latest technical readings for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicatorSet {
    pub price: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub rsi: f64,
    pub volume: f64,
    pub volume_sma_20: f64,
    /// Percent distance of close above (+) or below (-) the 50-day average.
    pub price_vs_sma50: f64,
    pub price_vs_sma200: f64,
    /// Percent of today's volume over the 20-day volume average.
    pub volume_trend: f64,
}

impl TechnicalIndicatorSet {
    /// Readings that score as "no trend": RSI 50, every ratio flat.
    pub fn neutral() -> Self {
        Self {
            price: 0.0,
            sma_50: 0.0,
            sma_200: 0.0,
            rsi: 50.0,
            volume: 0.0,
            volume_sma_20: 0.0,
            price_vs_sma50: 0.0,
            price_vs_sma200: 0.0,
            volume_trend: 0.0,
        }
    }
}

/// Categorical read of the 0-25 momentum score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumSignal {
    Strong,
    Positive,
    Neutral,
    Negative,
    Weak,
}

impl MomentumSignal {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 20.0 => MomentumSignal::Strong,
            s if s >= 15.0 => MomentumSignal::Positive,
            s if s >= 10.0 => MomentumSignal::Neutral,
            s if s >= 5.0 => MomentumSignal::Negative,
            _ => MomentumSignal::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MomentumSignal::Strong => "STRONG",
            MomentumSignal::Positive => "POSITIVE",
            MomentumSignal::Neutral => "NEUTRAL",
            MomentumSignal::Negative => "NEGATIVE",
            MomentumSignal::Weak => "WEAK",
        }
    }
}

/// One scored sub-scale (e.g. "P/E vs Sector", 6 of 8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: String,
    pub score: f64,
    pub max: f64,
    /// Raw input the sub-scale was scored from, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl ComponentScore {
    pub fn new(name: &str, score: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            score,
            max,
            value: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Share of the sub-scale's maximum, 0-100.
    pub fn pct_of_max(&self) -> f64 {
        if self.max > 0.0 {
            self.score / self.max * 100.0
        } else {
            0.0
        }
    }
}

/// Momentum score with the readings and sub-scales behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumDetail {
    pub score: f64,
    pub signal: MomentumSignal,
    pub components: Vec<ComponentScore>,
    pub indicators: TechnicalIndicatorSet,
    pub explanation: String,
}

/// Full result of scoring one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_score: f64,
    pub value_score: f64,
    pub quality_score: f64,
    pub momentum_score: f64,
    pub health_score: f64,
    pub signal: Signal,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub reasoning: String,
    /// Value, quality and health sub-scales in scoring order.
    pub components: Vec<ComponentScore>,
    pub momentum: Option<MomentumDetail>,
    /// Set when momentum fell back to the neutral score.
    pub momentum_note: Option<String>,
}

/// Current score for an instrument, overwritten by every scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub ticker: String,
    pub sector: Option<String>,
    pub total_score: f64,
    pub value_score: f64,
    pub quality_score: f64,
    pub momentum_score: f64,
    pub health_score: f64,
    pub signal: Signal,
    pub calculated_at: DateTime<Utc>,
}

impl ScoreSnapshot {
    pub fn from_breakdown(ticker: &str, sector: Option<&str>, breakdown: &ScoreBreakdown) -> Self {
        Self {
            ticker: ticker.to_string(),
            sector: sector.map(str::to_string),
            total_score: breakdown.total_score,
            value_score: breakdown.value_score,
            quality_score: breakdown.quality_score,
            momentum_score: breakdown.momentum_score,
            health_score: breakdown.health_score,
            signal: breakdown.signal,
            calculated_at: Utc::now(),
        }
    }
}

/// Point-in-time copy of a [`ScoreSnapshot`], unique per (ticker, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    pub ticker: String,
    pub snapshot_date: NaiveDate,
    pub total_score: f64,
    pub value_score: f64,
    pub quality_score: f64,
    pub momentum_score: f64,
    pub health_score: f64,
    pub signal: Signal,
}

impl ScoreHistoryEntry {
    pub fn from_snapshot(snapshot: &ScoreSnapshot, snapshot_date: NaiveDate) -> Self {
        Self {
            ticker: snapshot.ticker.clone(),
            snapshot_date,
            total_score: snapshot.total_score,
            value_score: snapshot.value_score,
            quality_score: snapshot.quality_score,
            momentum_score: snapshot.momentum_score,
            health_score: snapshot.health_score,
            signal: snapshot.signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signal_thresholds() {
        assert_eq!(Signal::from_total_score(90.0), Signal::StrongBuy);
        assert_eq!(Signal::from_total_score(89.99), Signal::Buy);
        assert_eq!(Signal::from_total_score(75.0), Signal::Buy);
        assert_eq!(Signal::from_total_score(50.0), Signal::Hold);
        assert_eq!(Signal::from_total_score(49.99), Signal::Sell);
        assert_eq!(Signal::from_total_score(25.0), Signal::Sell);
        assert_eq!(Signal::from_total_score(24.99), Signal::StrongSell);
        assert_eq!(Signal::from_total_score(0.0), Signal::StrongSell);
    }

    #[test]
    fn test_signal_is_monotonic() {
        let mut previous = Signal::StrongSell;
        for step in 0..=1000 {
            let signal = Signal::from_total_score(step as f64 / 10.0);
            assert!(signal >= previous);
            previous = signal;
        }
    }

    #[test]
    fn test_signal_string_forms() {
        assert_eq!(Signal::StrongBuy.to_string(), "STRONG_BUY");
        assert_eq!("hold".parse::<Signal>().unwrap(), Signal::Hold);
        assert!("sideways".parse::<Signal>().is_err());
        assert_eq!(serde_json::to_string(&Signal::StrongSell).unwrap(), "\"STRONG_SELL\"");
    }

    #[test]
    fn test_sector_class() {
        assert_eq!(SectorClass::from_sector(Some("Financial Services")), SectorClass::Financial);
        assert_eq!(SectorClass::from_sector(Some("Banks")), SectorClass::Financial);
        assert_eq!(SectorClass::from_sector(Some("Utilities")), SectorClass::Utility);
        assert_eq!(SectorClass::from_sector(Some("Industrials")), SectorClass::Standard);
        assert_eq!(SectorClass::from_sector(None), SectorClass::Standard);
    }

    #[test]
    fn test_momentum_signal_bands() {
        assert_eq!(MomentumSignal::from_score(25.0), MomentumSignal::Strong);
        assert_eq!(MomentumSignal::from_score(15.0), MomentumSignal::Positive);
        assert_eq!(MomentumSignal::from_score(12.5), MomentumSignal::Neutral);
        assert_eq!(MomentumSignal::from_score(5.0), MomentumSignal::Negative);
        assert_eq!(MomentumSignal::from_score(4.5), MomentumSignal::Weak);
    }

    #[test]
    fn test_history_period_parse() {
        assert_eq!("1y".parse::<HistoryPeriod>().unwrap().days(), 365);
        assert_eq!("5y".parse::<HistoryPeriod>().unwrap().days(), 1825);
        assert_eq!(HistoryPeriod::SixMonths.as_str(), "6mo");
        assert!(matches!(
            "10y".parse::<HistoryPeriod>(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ratio_f64() {
        assert_eq!(ratio_f64(Some(dec!(12.5))), Some(12.5));
        assert_eq!(ratio_f64(None), None);
    }

    #[test]
    fn test_history_entry_copies_snapshot() {
        let snapshot = ScoreSnapshot {
            ticker: "ACME".to_string(),
            sector: Some("Industrials".to_string()),
            total_score: 61.5,
            value_score: 14.0,
            quality_score: 15.0,
            momentum_score: 12.5,
            health_score: 20.0,
            signal: Signal::Hold,
            calculated_at: Utc::now(),
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let entry = ScoreHistoryEntry::from_snapshot(&snapshot, date);
        assert_eq!(entry.ticker, "ACME");
        assert_eq!(entry.snapshot_date, date);
        assert_eq!(entry.total_score, 61.5);
        assert_eq!(entry.signal, Signal::Hold);
    }
}
