//! Four-factor instrument scoring.
//!
//! Value, quality and health come from fundamentals read against the sector
//! benchmarks and a frozen ROIC baseline; momentum comes from the technical
//! readings when they are available. Each factor is bounded to 0-25 and the total
//! is their exact sum.

use std::collections::HashMap;

use analysis_core::adaptive::{median, quantiles_exclusive};
use analysis_core::{
    ratio_f64, ComponentScore, Fundamentals, InstrumentFundamentals, ScoreBreakdown, SectorBenchmark,
    SectorClass, Signal, TechnicalIndicatorSet, Tier, TierTable,
};
use serde::{Deserialize, Serialize};
use technical_analysis::MomentumScorer;

use crate::narrative;

/// Momentum score used when no price history is available.
pub const NEUTRAL_MOMENTUM_SCORE: f64 = 12.5;

pub const MISSING_MOMENTUM_NOTE: &str = "No price data available - using neutral momentum score";

// Sector averages substituted when a benchmark is missing.
const DEFAULT_SECTOR_PE: f64 = 20.0;
const DEFAULT_SECTOR_EV_EBITDA: f64 = 15.0;
const DEFAULT_SECTOR_ROE: f64 = 15.0;

// Inputs above these are read as the cap.
const PE_CAP: f64 = 100.0;
const EV_EBITDA_CAP: f64 = 100.0;
const ROIC_CAP: f64 = 200.0;
const ROE_CAP: f64 = 200.0;

/// P/E as a fraction of the sector average, max 8. Half the sector average or
/// less takes the top tier.
pub const PE_VS_SECTOR: TierTable<4> = TierTable::new(
    [
        Tier::at_most(0.5, 8.0),
        Tier::below(0.75, 6.0),
        Tier::at_most(1.25, 4.0),
        Tier::at_most(2.0, 2.0),
    ],
    0.0,
);

/// EV/EBITDA as a fraction of the sector average, max 6.
pub const EV_EBITDA_VS_SECTOR: TierTable<4> = TierTable::new(
    [
        Tier::below(0.6, 6.0),
        Tier::below(0.85, 4.0),
        Tier::at_most(1.15, 3.0),
        Tier::at_most(2.0, 1.0),
    ],
    0.0,
);

pub const PEG: TierTable<4> = TierTable::new(
    [
        Tier::below(0.5, 6.0),
        Tier::below(1.0, 5.0),
        Tier::below(1.5, 4.0),
        Tier::below(2.0, 2.0),
    ],
    0.0,
);

pub const PRICE_TO_BOOK: TierTable<2> =
    TierTable::new([Tier::below(2.0, 5.0), Tier::below(5.0, 3.0)], 1.0);

/// ROE as a fraction of the sector average, max 7.
pub const ROE_VS_SECTOR: TierTable<4> = TierTable::new(
    [
        Tier::above(1.5, 7.0),
        Tier::above(1.25, 5.0),
        Tier::at_least(0.75, 3.0),
        Tier::at_least(0.5, 1.0),
    ],
    0.0,
);

pub const NET_MARGIN: TierTable<4> = TierTable::new(
    [
        Tier::at_least(20.0, 5.0),
        Tier::at_least(15.0, 4.0),
        Tier::at_least(10.0, 3.0),
        Tier::at_least(5.0, 2.0),
    ],
    1.0,
);

pub const FCF_YIELD_QUALITY: TierTable<3> = TierTable::new(
    [
        Tier::at_least(8.0, 3.0),
        Tier::at_least(5.0, 2.0),
        Tier::at_least(2.0, 1.0),
    ],
    0.0,
);

pub const DEBT_EQUITY_STANDARD: TierTable<4> = TierTable::new(
    [
        Tier::below(0.3, 10.0),
        Tier::below(0.5, 8.0),
        Tier::below(1.0, 5.0),
        Tier::below(2.0, 2.0),
    ],
    0.0,
);

/// Relaxed leverage tiers for capital-intensive utilities.
pub const DEBT_EQUITY_UTILITY: TierTable<4> = TierTable::new(
    [
        Tier::below(0.5, 10.0),
        Tier::below(1.0, 8.0),
        Tier::below(2.0, 5.0),
        Tier::below(3.0, 2.0),
    ],
    0.0,
);

pub const CURRENT_RATIO: TierTable<4> = TierTable::new(
    [
        Tier::at_least(2.5, 6.0),
        Tier::at_least(2.0, 5.0),
        Tier::at_least(1.5, 4.0),
        Tier::at_least(1.0, 2.0),
    ],
    0.0,
);

pub const INTEREST_COVERAGE: TierTable<4> = TierTable::new(
    [
        Tier::at_least(10.0, 5.0),
        Tier::at_least(5.0, 4.0),
        Tier::at_least(3.0, 3.0),
        Tier::at_least(1.5, 1.0),
    ],
    0.0,
);

pub const FCF_YIELD_HEALTH: TierTable<4> = TierTable::new(
    [
        Tier::at_least(8.0, 4.0),
        Tier::at_least(5.0, 3.0),
        Tier::at_least(3.0, 2.0),
        Tier::at_least(1.0, 1.0),
    ],
    0.0,
);

/// Population ROIC cut points, frozen when the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoicBaseline {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl RoicBaseline {
    /// Used when the population has fewer than four positive ROIC values.
    pub const FALLBACK: RoicBaseline = RoicBaseline {
        p25: 6.0,
        p50: 12.0,
        p75: 18.0,
        p90: 25.0,
    };

    /// Cut points over the positive values of `roic_values`.
    pub fn from_values(roic_values: &[f64]) -> Self {
        let positive: Vec<f64> = roic_values.iter().copied().filter(|&v| v > 0.0).collect();
        if positive.len() < 4 {
            return Self::FALLBACK;
        }

        let max = positive.iter().copied().fold(f64::MIN, f64::max);
        let quartiles = quantiles_exclusive(&positive, 4).unwrap_or_default();
        let p90 = if positive.len() >= 10 {
            quantiles_exclusive(&positive, 10)
                .ok()
                .and_then(|deciles| deciles.get(8).copied())
                .unwrap_or(max)
        } else {
            max
        };

        Self {
            p25: quartiles.first().copied().unwrap_or(Self::FALLBACK.p25),
            p50: median(&positive),
            p75: quartiles.get(2).copied().unwrap_or(Self::FALLBACK.p75),
            p90,
        }
    }

    pub fn from_population(population: &[InstrumentFundamentals]) -> Self {
        let values: Vec<f64> = population
            .iter()
            .filter_map(|i| ratio_f64(i.fundamentals.roic))
            .collect();
        Self::from_values(&values)
    }

    fn table(&self) -> TierTable<4> {
        TierTable::new(
            [
                Tier::at_least(self.p90, 10.0),
                Tier::at_least(self.p75, 8.0),
                Tier::at_least(self.p50, 5.0),
                Tier::at_least(self.p25, 3.0),
            ],
            0.0,
        )
    }
}

/// One factor's bounded score and the sub-scales it was summed from.
#[derive(Debug, Clone)]
pub struct FactorScore {
    pub score: f64,
    pub components: Vec<ComponentScore>,
}

impl FactorScore {
    fn from_components(components: Vec<ComponentScore>) -> Self {
        let score = components.iter().map(|c| c.score).sum();
        Self { score, components }
    }
}

pub fn score_pe_ratio(pe: Option<f64>, sector_avg: Option<f64>) -> f64 {
    match pe {
        Some(pe) if pe > 0.0 => {
            let avg = sector_avg.filter(|&a| a > 0.0).unwrap_or(DEFAULT_SECTOR_PE);
            PE_VS_SECTOR.score(pe.min(PE_CAP) / avg)
        }
        // losses or no data
        _ => 0.0,
    }
}

pub fn score_ev_ebitda(ev_ebitda: Option<f64>, sector_avg: Option<f64>) -> f64 {
    match ev_ebitda {
        Some(ev) if ev > 0.0 => {
            let avg = sector_avg.filter(|&a| a > 0.0).unwrap_or(DEFAULT_SECTOR_EV_EBITDA);
            EV_EBITDA_VS_SECTOR.score(ev.min(EV_EBITDA_CAP) / avg)
        }
        _ => 3.0,
    }
}

pub fn score_peg_ratio(peg: Option<f64>, pe: Option<f64>) -> f64 {
    match peg {
        None => 3.0,
        Some(peg) if peg < 0.0 => 0.0,
        Some(peg) => {
            let score = PEG.score(peg);
            if pe.map_or(false, |pe| pe > 50.0) {
                score.min(2.0)
            } else {
                score
            }
        }
    }
}

pub fn score_pb_ratio(pb: Option<f64>) -> f64 {
    match pb {
        None => 2.5,
        Some(pb) if pb < 0.0 => 0.0,
        Some(pb) => PRICE_TO_BOOK.score(pb),
    }
}

pub fn score_roic_percentile(roic: Option<f64>, baseline: &RoicBaseline) -> f64 {
    match roic {
        Some(roic) if roic > 0.0 => baseline.table().score(roic.min(ROIC_CAP)),
        _ => 0.0,
    }
}

pub fn score_roe(roe: Option<f64>, sector_avg: Option<f64>) -> f64 {
    match roe {
        None => 3.5,
        Some(roe) if roe <= 0.0 => 0.0,
        Some(roe) => {
            let avg = sector_avg.filter(|&a| a > 0.0).unwrap_or(DEFAULT_SECTOR_ROE);
            ROE_VS_SECTOR.score(roe.min(ROE_CAP) / avg)
        }
    }
}

pub fn score_net_margin(margin: Option<f64>) -> f64 {
    match margin {
        None => 2.5,
        Some(m) if m < 0.0 => 0.0,
        Some(m) => NET_MARGIN.score(m),
    }
}

pub fn score_fcf_yield_quality(fcf_yield: Option<f64>) -> f64 {
    match fcf_yield {
        None => 1.5,
        Some(y) if y < 0.0 => 0.0,
        Some(y) => FCF_YIELD_QUALITY.score(y),
    }
}

pub fn score_debt_equity(debt_equity: Option<f64>, class: SectorClass) -> f64 {
    match (debt_equity, class) {
        (None, _) => 5.0,
        (Some(de), _) if de < 0.0 => 0.0,
        (Some(_), SectorClass::Financial) => 5.0,
        (Some(de), SectorClass::Utility) => DEBT_EQUITY_UTILITY.score(de),
        (Some(de), SectorClass::Standard) => DEBT_EQUITY_STANDARD.score(de),
    }
}

pub fn score_current_ratio(current_ratio: Option<f64>, class: SectorClass) -> f64 {
    if class == SectorClass::Financial {
        return 3.0;
    }
    match current_ratio {
        None => 3.0,
        Some(cr) if cr < 0.0 => 0.0,
        Some(cr) => CURRENT_RATIO.score(cr),
    }
}

pub fn score_interest_coverage(coverage: Option<f64>) -> f64 {
    match coverage {
        None => 2.5,
        Some(ic) if ic < 0.0 => 0.0,
        Some(ic) => INTEREST_COVERAGE.score(ic),
    }
}

pub fn score_fcf_yield_health(fcf_yield: Option<f64>) -> f64 {
    match fcf_yield {
        None => 2.0,
        Some(y) if y < 0.0 => 0.0,
        Some(y) => FCF_YIELD_HEALTH.score(y),
    }
}

/// Scores instruments against one population snapshot.
///
/// Build a fresh engine for every batch pass; the ROIC baseline and benchmark map
/// do not change for the lifetime of an instance.
pub struct ScoringEngine {
    baseline: RoicBaseline,
    benchmarks: HashMap<String, SectorBenchmark>,
    /// Resolved once for every sector in the population and benchmark map.
    sector_classes: HashMap<String, SectorClass>,
    momentum: MomentumScorer,
}

impl ScoringEngine {
    pub fn new(
        population: &[InstrumentFundamentals],
        benchmarks: HashMap<String, SectorBenchmark>,
    ) -> Self {
        let mut engine = Self::with_baseline(RoicBaseline::from_population(population), benchmarks);
        for sector in population.iter().filter_map(|item| item.sector.as_deref()) {
            if !engine.sector_classes.contains_key(sector) {
                engine
                    .sector_classes
                    .insert(sector.to_string(), SectorClass::from_sector(Some(sector)));
            }
        }
        engine
    }

    pub fn with_baseline(baseline: RoicBaseline, benchmarks: HashMap<String, SectorBenchmark>) -> Self {
        let sector_classes = benchmarks
            .keys()
            .map(|sector| (sector.clone(), SectorClass::from_sector(Some(sector))))
            .collect();
        Self {
            baseline,
            benchmarks,
            sector_classes,
            momentum: MomentumScorer::new(),
        }
    }

    /// Class for `sector`; sectors outside the population are resolved on the spot.
    pub fn sector_class(&self, sector: Option<&str>) -> SectorClass {
        match sector {
            Some(name) => self
                .sector_classes
                .get(name)
                .copied()
                .unwrap_or_else(|| SectorClass::from_sector(sector)),
            None => SectorClass::Standard,
        }
    }

    pub fn baseline(&self) -> &RoicBaseline {
        &self.baseline
    }

    pub fn benchmark(&self, sector: &str) -> Option<&SectorBenchmark> {
        self.benchmarks.get(sector)
    }

    pub fn score(
        &self,
        fundamentals: &Fundamentals,
        sector: Option<&str>,
        indicators: Option<&TechnicalIndicatorSet>,
    ) -> ScoreBreakdown {
        let benchmark = sector.and_then(|s| self.benchmarks.get(s));
        let class = self.sector_class(sector);

        let value = self.value_factor(fundamentals, benchmark);
        let quality = self.quality_factor(fundamentals, benchmark);
        let health = self.health_factor(fundamentals, class);

        let (momentum_score, momentum, momentum_note) = match indicators {
            Some(indicators) => {
                let detail = self.momentum.score(indicators);
                (detail.score, Some(detail), None)
            }
            None => (NEUTRAL_MOMENTUM_SCORE, None, Some(MISSING_MOMENTUM_NOTE.to_string())),
        };

        let total_score = value.score + quality.score + momentum_score + health.score;
        let signal = Signal::from_total_score(total_score);

        let (strengths, weaknesses) =
            narrative::strengths_and_weaknesses(&value, &quality, &health, momentum_note.is_some());
        let reasoning = narrative::reasoning(signal, &value, &quality, &health, &strengths, &weaknesses);

        let components = value
            .components
            .into_iter()
            .chain(quality.components)
            .chain(health.components)
            .collect();

        ScoreBreakdown {
            total_score,
            value_score: value.score,
            quality_score: quality.score,
            momentum_score,
            health_score: health.score,
            signal,
            strengths,
            weaknesses,
            reasoning,
            components,
            momentum,
            momentum_note,
        }
    }

    fn value_factor(&self, f: &Fundamentals, benchmark: Option<&SectorBenchmark>) -> FactorScore {
        let pe = ratio_f64(f.pe_ratio);
        FactorScore::from_components(vec![
            ComponentScore::new(
                "P/E vs Sector",
                score_pe_ratio(pe, benchmark.and_then(|b| b.avg_pe)),
                8.0,
            ),
            ComponentScore::new(
                "EV/EBITDA vs Sector",
                score_ev_ebitda(ratio_f64(f.ev_ebitda), benchmark.and_then(|b| b.avg_ev_ebitda)),
                6.0,
            ),
            ComponentScore::new("PEG Ratio", score_peg_ratio(ratio_f64(f.peg_ratio), pe), 6.0),
            ComponentScore::new("P/B Ratio", score_pb_ratio(ratio_f64(f.pb_ratio)), 5.0),
        ])
    }

    fn quality_factor(&self, f: &Fundamentals, benchmark: Option<&SectorBenchmark>) -> FactorScore {
        FactorScore::from_components(vec![
            ComponentScore::new(
                "ROIC Percentile",
                score_roic_percentile(ratio_f64(f.roic), &self.baseline),
                10.0,
            ),
            ComponentScore::new(
                "ROE vs Sector",
                score_roe(ratio_f64(f.roe), benchmark.and_then(|b| b.avg_roe)),
                7.0,
            ),
            ComponentScore::new("Margin Quality", score_net_margin(ratio_f64(f.net_margin)), 5.0),
            ComponentScore::new("FCF Yield", score_fcf_yield_quality(ratio_f64(f.fcf_yield)), 3.0),
        ])
    }

    fn health_factor(&self, f: &Fundamentals, class: SectorClass) -> FactorScore {
        FactorScore::from_components(vec![
            ComponentScore::new(
                "Debt/Equity Ratio",
                score_debt_equity(ratio_f64(f.debt_equity), class),
                10.0,
            ),
            ComponentScore::new(
                "Current Ratio",
                score_current_ratio(ratio_f64(f.current_ratio), class),
                6.0,
            ),
            ComponentScore::new(
                "Interest Coverage",
                score_interest_coverage(ratio_f64(f.interest_coverage)),
                5.0,
            ),
            ComponentScore::new(
                "FCF Yield (Health)",
                score_fcf_yield_health(ratio_f64(f.fcf_yield)),
                4.0,
            ),
        ])
    }
}
