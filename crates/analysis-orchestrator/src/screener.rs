use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use analysis_core::adaptive::percentile_value;
use analysis_core::{ratio_f64, AnalysisError, Fundamentals, InstrumentFundamentals, ScoreSnapshot, Signal};
use serde::{Deserialize, Serialize};

/// Columns a screen can filter or sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenMetric {
    PeRatio,
    PegRatio,
    PbRatio,
    Roic,
    Roe,
    NetMargin,
    DebtEquity,
    CurrentRatio,
    FcfYield,
    RevenueGrowth,
    EarningsGrowth,
    DividendYield,
    PayoutRatio,
    TotalScore,
    ValueScore,
    QualityScore,
    MomentumScore,
    HealthScore,
}

impl ScreenMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenMetric::PeRatio => "pe_ratio",
            ScreenMetric::PegRatio => "peg_ratio",
            ScreenMetric::PbRatio => "pb_ratio",
            ScreenMetric::Roic => "roic",
            ScreenMetric::Roe => "roe",
            ScreenMetric::NetMargin => "net_margin",
            ScreenMetric::DebtEquity => "debt_equity",
            ScreenMetric::CurrentRatio => "current_ratio",
            ScreenMetric::FcfYield => "fcf_yield",
            ScreenMetric::RevenueGrowth => "revenue_growth",
            ScreenMetric::EarningsGrowth => "earnings_growth",
            ScreenMetric::DividendYield => "dividend_yield",
            ScreenMetric::PayoutRatio => "payout_ratio",
            ScreenMetric::TotalScore => "total_score",
            ScreenMetric::ValueScore => "value_score",
            ScreenMetric::QualityScore => "quality_score",
            ScreenMetric::MomentumScore => "momentum_score",
            ScreenMetric::HealthScore => "health_score",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ScreenMetric::PeRatio => "P/E",
            ScreenMetric::PegRatio => "PEG",
            ScreenMetric::PbRatio => "P/B",
            ScreenMetric::Roic => "ROIC",
            ScreenMetric::Roe => "ROE",
            ScreenMetric::NetMargin => "Net Margin",
            ScreenMetric::DebtEquity => "D/E",
            ScreenMetric::CurrentRatio => "Current Ratio",
            ScreenMetric::FcfYield => "FCF Yield",
            ScreenMetric::RevenueGrowth => "Revenue Growth",
            ScreenMetric::EarningsGrowth => "Earnings Growth",
            ScreenMetric::DividendYield => "Dividend Yield",
            ScreenMetric::PayoutRatio => "Payout Ratio",
            ScreenMetric::TotalScore => "Total Score",
            ScreenMetric::ValueScore => "Value Score",
            ScreenMetric::QualityScore => "Quality Score",
            ScreenMetric::MomentumScore => "Momentum Score",
            ScreenMetric::HealthScore => "Health Score",
        }
    }

    /// Reading for one instrument; score columns are `None` until it has been scored.
    pub fn value(&self, fundamentals: &Fundamentals, snapshot: Option<&ScoreSnapshot>) -> Option<f64> {
        match self {
            ScreenMetric::PeRatio => ratio_f64(fundamentals.pe_ratio),
            ScreenMetric::PegRatio => ratio_f64(fundamentals.peg_ratio),
            ScreenMetric::PbRatio => ratio_f64(fundamentals.pb_ratio),
            ScreenMetric::Roic => ratio_f64(fundamentals.roic),
            ScreenMetric::Roe => ratio_f64(fundamentals.roe),
            ScreenMetric::NetMargin => ratio_f64(fundamentals.net_margin),
            ScreenMetric::DebtEquity => ratio_f64(fundamentals.debt_equity),
            ScreenMetric::CurrentRatio => ratio_f64(fundamentals.current_ratio),
            ScreenMetric::FcfYield => ratio_f64(fundamentals.fcf_yield),
            ScreenMetric::RevenueGrowth => ratio_f64(fundamentals.revenue_growth),
            ScreenMetric::EarningsGrowth => ratio_f64(fundamentals.earnings_growth),
            ScreenMetric::DividendYield => ratio_f64(fundamentals.dividend_yield),
            ScreenMetric::PayoutRatio => ratio_f64(fundamentals.payout_ratio),
            ScreenMetric::TotalScore => snapshot.map(|s| s.total_score),
            ScreenMetric::ValueScore => snapshot.map(|s| s.value_score),
            ScreenMetric::QualityScore => snapshot.map(|s| s.quality_score),
            ScreenMetric::MomentumScore => snapshot.map(|s| s.momentum_score),
            ScreenMetric::HealthScore => snapshot.map(|s| s.health_score),
        }
    }
}

impl fmt::Display for ScreenMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreenMetric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pe_ratio" | "pe" => Ok(ScreenMetric::PeRatio),
            "peg_ratio" | "peg" => Ok(ScreenMetric::PegRatio),
            "pb_ratio" | "pb" => Ok(ScreenMetric::PbRatio),
            "roic" => Ok(ScreenMetric::Roic),
            "roe" => Ok(ScreenMetric::Roe),
            "net_margin" => Ok(ScreenMetric::NetMargin),
            "debt_equity" => Ok(ScreenMetric::DebtEquity),
            "current_ratio" => Ok(ScreenMetric::CurrentRatio),
            "fcf_yield" => Ok(ScreenMetric::FcfYield),
            "revenue_growth" => Ok(ScreenMetric::RevenueGrowth),
            "earnings_growth" => Ok(ScreenMetric::EarningsGrowth),
            "dividend_yield" => Ok(ScreenMetric::DividendYield),
            "payout_ratio" => Ok(ScreenMetric::PayoutRatio),
            "total_score" => Ok(ScreenMetric::TotalScore),
            "value_score" => Ok(ScreenMetric::ValueScore),
            "quality_score" => Ok(ScreenMetric::QualityScore),
            "momentum_score" => Ok(ScreenMetric::MomentumScore),
            "health_score" => Ok(ScreenMetric::HealthScore),
            other => Err(AnalysisError::InvalidInput(format!("unknown screen metric '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AnalysisError::InvalidInput(format!("unknown sort order '{}'", other))),
        }
    }
}

/// Inclusive bounds on one metric. An instrument without a reading fails any bound.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MetricRange {
    pub fn contains(&self, value: Option<f64>) -> bool {
        match value {
            Some(v) => self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max),
            None => self.min.is_none() && self.max.is_none(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerCriteria {
    /// Bounds in the order they were added; one entry per metric.
    pub ranges: Vec<(ScreenMetric, MetricRange)>,
    pub sector: Option<String>,
    pub signal: Option<Signal>,
    /// Keep only instruments whose total score reaches this percentile (0-100) of
    /// the scored population.
    pub min_score_percentile: Option<f64>,
    pub sort_by: ScreenMetric,
    pub sort_order: SortOrder,
    pub limit: usize,
}

impl Default for ScreenerCriteria {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            sector: None,
            signal: None,
            min_score_percentile: None,
            sort_by: ScreenMetric::TotalScore,
            sort_order: SortOrder::Desc,
            limit: 50,
        }
    }
}

impl ScreenerCriteria {
    pub fn min(mut self, metric: ScreenMetric, value: f64) -> Self {
        self.range_mut(metric).min = Some(value);
        self
    }

    pub fn max(mut self, metric: ScreenMetric, value: f64) -> Self {
        self.range_mut(metric).max = Some(value);
        self
    }

    pub fn sorted_by(mut self, metric: ScreenMetric, order: SortOrder) -> Self {
        self.sort_by = metric;
        self.sort_order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn range(&self, metric: ScreenMetric) -> Option<&MetricRange> {
        self.ranges.iter().find(|(m, _)| *m == metric).map(|(_, r)| r)
    }

    fn range_mut(&mut self, metric: ScreenMetric) -> &mut MetricRange {
        let idx = match self.ranges.iter().position(|(m, _)| *m == metric) {
            Some(idx) => idx,
            None => {
                self.ranges.push((metric, MetricRange::default()));
                self.ranges.len() - 1
            }
        };
        &mut self.ranges[idx].1
    }

    /// Low P/E, high ROIC, low debt.
    pub fn value_gems(limit: usize) -> Self {
        Self::default()
            .max(ScreenMetric::PeRatio, 15.0)
            .min(ScreenMetric::Roic, 15.0)
            .max(ScreenMetric::DebtEquity, 0.5)
            .sorted_by(ScreenMetric::Roic, SortOrder::Desc)
            .limit(limit)
    }

    /// Exceptional ROIC, fat margins, growing revenue.
    pub fn quality_compounders(limit: usize) -> Self {
        Self::default()
            .min(ScreenMetric::Roic, 20.0)
            .min(ScreenMetric::NetMargin, 15.0)
            .min(ScreenMetric::RevenueGrowth, 0.0)
            .sorted_by(ScreenMetric::Roic, SortOrder::Desc)
            .limit(limit)
    }

    /// High yield with a sustainable payout and a healthy balance sheet.
    pub fn dividend_kings(limit: usize) -> Self {
        Self::default()
            .min(ScreenMetric::DividendYield, 3.0)
            .max(ScreenMetric::PayoutRatio, 70.0)
            .max(ScreenMetric::DebtEquity, 1.0)
            .sorted_by(ScreenMetric::DividendYield, SortOrder::Desc)
            .limit(limit)
    }

    /// Cheap on book value, cash generative, not overleveraged.
    pub fn deep_value(limit: usize) -> Self {
        Self::default()
            .max(ScreenMetric::PbRatio, 2.0)
            .min(ScreenMetric::FcfYield, 3.0)
            .max(ScreenMetric::DebtEquity, 1.0)
            .sorted_by(ScreenMetric::PbRatio, SortOrder::Asc)
            .limit(limit)
    }

    /// Fast revenue growth at a reasonable PEG, already profitable.
    pub fn explosive_growth(limit: usize) -> Self {
        Self::default()
            .min(ScreenMetric::RevenueGrowth, 30.0)
            .max(ScreenMetric::PegRatio, 2.0)
            .min(ScreenMetric::NetMargin, 0.0)
            .sorted_by(ScreenMetric::RevenueGrowth, SortOrder::Desc)
            .limit(limit)
    }

    /// Human-readable summary, e.g. `P/E ≤ 15 | ROIC ≥ 15`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (metric, range) in &self.ranges {
            let mut bounds = Vec::new();
            if let Some(min) = range.min {
                bounds.push(format!("{} ≥ {}", metric.label(), min));
            }
            if let Some(max) = range.max {
                bounds.push(format!("{} ≤ {}", metric.label(), max));
            }
            if !bounds.is_empty() {
                parts.push(bounds.join(" and "));
            }
        }
        if let Some(sector) = &self.sector {
            parts.push(format!("Sector = {}", sector));
        }
        if let Some(signal) = self.signal {
            parts.push(format!("Signal = {}", signal));
        }
        if let Some(pct) = self.min_score_percentile {
            parts.push(format!("Total Score ≥ p{}", pct));
        }

        if parts.is_empty() {
            "No filters applied".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

/// Named preset screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenerStrategy {
    ValueGems,
    QualityCompounders,
    DividendKings,
    DeepValue,
    ExplosiveGrowth,
}

impl ScreenerStrategy {
    pub const ALL: [ScreenerStrategy; 5] = [
        ScreenerStrategy::ValueGems,
        ScreenerStrategy::QualityCompounders,
        ScreenerStrategy::DividendKings,
        ScreenerStrategy::DeepValue,
        ScreenerStrategy::ExplosiveGrowth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScreenerStrategy::ValueGems => "Value Gems",
            ScreenerStrategy::QualityCompounders => "Quality Compounders",
            ScreenerStrategy::DividendKings => "Dividend Kings",
            ScreenerStrategy::DeepValue => "Deep Value",
            ScreenerStrategy::ExplosiveGrowth => "Explosive Growth",
        }
    }

    pub fn criteria(&self, limit: usize) -> ScreenerCriteria {
        match self {
            ScreenerStrategy::ValueGems => ScreenerCriteria::value_gems(limit),
            ScreenerStrategy::QualityCompounders => ScreenerCriteria::quality_compounders(limit),
            ScreenerStrategy::DividendKings => ScreenerCriteria::dividend_kings(limit),
            ScreenerStrategy::DeepValue => ScreenerCriteria::deep_value(limit),
            ScreenerStrategy::ExplosiveGrowth => ScreenerCriteria::explosive_growth(limit),
        }
    }
}

impl FromStr for ScreenerStrategy {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "value-gems" => Ok(ScreenerStrategy::ValueGems),
            "quality-compounders" => Ok(ScreenerStrategy::QualityCompounders),
            "dividend-kings" => Ok(ScreenerStrategy::DividendKings),
            "deep-value" => Ok(ScreenerStrategy::DeepValue),
            "explosive-growth" => Ok(ScreenerStrategy::ExplosiveGrowth),
            other => Err(AnalysisError::InvalidInput(format!("unknown screener strategy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerMatch {
    pub ticker: String,
    pub sector: Option<String>,
    pub total_score: Option<f64>,
    pub signal: Option<Signal>,
    pub fundamentals: Fundamentals,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerResponse {
    pub strategy: Option<String>,
    pub criteria: String,
    /// Instruments passing every filter, before the limit.
    pub total_matches: usize,
    pub results: Vec<ScreenerMatch>,
}

/// Filter instruments on fundamentals and current scores, then sort and truncate.
///
/// Instruments that have never been scored still pass fundamentals-only screens.
/// Missing sort values go last; ties break on ticker.
pub fn screen(
    population: &[InstrumentFundamentals],
    snapshots: &[ScoreSnapshot],
    criteria: &ScreenerCriteria,
) -> Result<ScreenerResponse, AnalysisError> {
    let by_ticker: HashMap<&str, &ScoreSnapshot> = snapshots.iter().map(|s| (s.ticker.as_str(), s)).collect();

    let score_floor = match criteria.min_score_percentile {
        Some(pct) => {
            let totals: Vec<f64> = snapshots.iter().map(|s| s.total_score).collect();
            Some(percentile_value(&totals, pct)?)
        }
        None => None,
    };

    let mut matches: Vec<(&InstrumentFundamentals, Option<&ScoreSnapshot>)> = population
        .iter()
        .map(|item| (item, by_ticker.get(item.ticker.as_str()).copied()))
        .filter(|(item, snapshot)| {
            criteria
                .ranges
                .iter()
                .all(|(metric, range)| range.contains(metric.value(&item.fundamentals, *snapshot)))
        })
        .filter(|(item, _)| match &criteria.sector {
            Some(sector) => item.sector.as_deref() == Some(sector.as_str()),
            None => true,
        })
        .filter(|(_, snapshot)| match criteria.signal {
            Some(signal) => snapshot.map_or(false, |s| s.signal == signal),
            None => true,
        })
        .filter(|(_, snapshot)| match score_floor {
            Some(floor) => snapshot.map_or(false, |s| s.total_score >= floor),
            None => true,
        })
        .collect();

    let sort_by = criteria.sort_by;
    matches.sort_by(|(a, sa), (b, sb)| {
        let ordering = match (sort_by.value(&a.fundamentals, *sa), sort_by.value(&b.fundamentals, *sb)) {
            (Some(x), Some(y)) => match criteria.sort_order {
                SortOrder::Asc => x.total_cmp(&y),
                SortOrder::Desc => y.total_cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        ordering.then_with(|| a.ticker.cmp(&b.ticker))
    });

    let total_matches = matches.len();
    let results = matches
        .into_iter()
        .take(criteria.limit)
        .map(|(item, snapshot)| ScreenerMatch {
            ticker: item.ticker.clone(),
            sector: item.sector.clone(),
            total_score: snapshot.map(|s| s.total_score),
            signal: snapshot.map(|s| s.signal),
            fundamentals: item.fundamentals.clone(),
            strengths: screen_strengths(&item.fundamentals),
            weaknesses: screen_weaknesses(&item.fundamentals),
        })
        .collect();

    Ok(ScreenerResponse {
        strategy: None,
        criteria: criteria.describe(),
        total_matches,
        results,
    })
}

/// A reading that is present and non-zero; zero carries no signal for the notes.
fn reading(value: Option<rust_decimal::Decimal>) -> Option<f64> {
    ratio_f64(value).filter(|v| *v != 0.0)
}

fn screen_strengths(f: &Fundamentals) -> Vec<String> {
    let mut strengths = Vec::new();

    if let Some(pe) = reading(f.pe_ratio).filter(|v| *v < 15.0) {
        strengths.push(format!("Low P/E ratio ({:.1})", pe));
    }
    if let Some(peg) = reading(f.peg_ratio).filter(|v| *v < 1.5) {
        strengths.push(format!("Attractive PEG ratio ({:.1})", peg));
    }
    if let Some(roic) = reading(f.roic).filter(|v| *v > 20.0) {
        strengths.push(format!("Excellent ROIC ({:.1}%)", roic));
    }
    if let Some(roe) = reading(f.roe).filter(|v| *v > 20.0) {
        strengths.push(format!("Strong ROE ({:.1}%)", roe));
    }
    if let Some(margin) = reading(f.net_margin).filter(|v| *v > 15.0) {
        strengths.push(format!("High net margin ({:.1}%)", margin));
    }
    if let Some(de) = reading(f.debt_equity).filter(|v| *v < 0.3) {
        strengths.push(format!("Low debt ({:.2} D/E)", de));
    }
    if let Some(cr) = reading(f.current_ratio).filter(|v| *v > 2.0) {
        strengths.push(format!("Strong liquidity ({:.1} current ratio)", cr));
    }
    if let Some(fcf) = reading(f.fcf_yield).filter(|v| *v > 5.0) {
        strengths.push(format!("High FCF yield ({:.1}%)", fcf));
    }
    if let Some(growth) = reading(f.revenue_growth).filter(|v| *v > 20.0) {
        strengths.push(format!("Strong revenue growth ({:.1}%)", growth));
    }
    if let Some(yield_pct) = reading(f.dividend_yield).filter(|v| *v > 3.0) {
        strengths.push(format!("Good dividend yield ({:.2}%)", yield_pct));
    }

    strengths.truncate(5);
    strengths
}

fn screen_weaknesses(f: &Fundamentals) -> Vec<String> {
    let mut weaknesses = Vec::new();

    if let Some(pe) = reading(f.pe_ratio).filter(|v| *v > 40.0) {
        weaknesses.push(format!("High P/E ratio ({:.1})", pe));
    }
    if let Some(peg) = reading(f.peg_ratio).filter(|v| *v > 2.5) {
        weaknesses.push(format!("Expensive PEG ratio ({:.1})", peg));
    }
    if let Some(roic) = reading(f.roic).filter(|v| *v < 10.0) {
        weaknesses.push(format!("Low ROIC ({:.1}%)", roic));
    }
    if let Some(margin) = reading(f.net_margin).filter(|v| *v < 5.0) {
        weaknesses.push(format!("Low net margin ({:.1}%)", margin));
    }
    if let Some(de) = reading(f.debt_equity).filter(|v| *v > 1.0) {
        weaknesses.push(format!("High debt ({:.2} D/E)", de));
    }
    if let Some(cr) = reading(f.current_ratio).filter(|v| *v < 1.0) {
        weaknesses.push(format!("Weak liquidity ({:.1} current ratio)", cr));
    }
    if let Some(growth) = reading(f.revenue_growth).filter(|v| *v < 0.0) {
        weaknesses.push(format!("Declining revenue ({:.1}%)", growth));
    }
    if let Some(growth) = reading(f.earnings_growth).filter(|v| *v < -10.0) {
        weaknesses.push(format!("Declining earnings ({:.1}%)", growth));
    }

    weaknesses.truncate(5);
    weaknesses
}
