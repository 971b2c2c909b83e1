//! Sector benchmark aggregation.
//!
//! Each metric is averaged over the sector's values that are present, strictly
//! positive and no larger than the metric's cap. Values outside that range are
//! dropped from the sample, not clamped.

use std::collections::{BTreeMap, HashMap};

use analysis_core::adaptive::mean_opt;
use analysis_core::{ratio_f64, Fundamentals, InstrumentFundamentals, SectorBenchmark};
use rust_decimal::Decimal;

/// Upper bound for a value to count towards its sector average.
#[derive(Debug, Clone, Copy)]
pub struct MetricCaps {
    pub pe: f64,
    pub ev_ebitda: f64,
    pub roic: f64,
    pub roe: f64,
    pub debt_equity: f64,
    pub margin: f64,
}

impl Default for MetricCaps {
    fn default() -> Self {
        Self {
            pe: 100.0,
            ev_ebitda: 100.0,
            roic: 200.0,
            roe: 200.0,
            debt_equity: 5.0,
            margin: 100.0,
        }
    }
}

pub struct SectorBenchmarkCalculator {
    caps: MetricCaps,
}

impl SectorBenchmarkCalculator {
    pub fn new() -> Self {
        Self {
            caps: MetricCaps::default(),
        }
    }

    pub fn with_caps(caps: MetricCaps) -> Self {
        Self { caps }
    }

    /// One benchmark per sector that has at least one instrument with fundamentals.
    /// Instruments without a sector are not benchmarked.
    pub fn calculate(&self, instruments: &[InstrumentFundamentals]) -> HashMap<String, SectorBenchmark> {
        let mut by_sector: BTreeMap<&str, Vec<&Fundamentals>> = BTreeMap::new();
        for instrument in instruments {
            if let Some(sector) = instrument.sector.as_deref() {
                by_sector.entry(sector).or_default().push(&instrument.fundamentals);
            }
        }

        by_sector
            .into_iter()
            .map(|(sector, members)| (sector.to_string(), self.benchmark(sector, &members)))
            .collect()
    }

    /// Benchmark for a single sector's members.
    pub fn benchmark(&self, sector: &str, members: &[&Fundamentals]) -> SectorBenchmark {
        let caps = &self.caps;
        SectorBenchmark {
            sector: sector.to_string(),
            avg_pe: eligible_mean(members.iter().map(|f| f.pe_ratio), caps.pe),
            avg_ev_ebitda: eligible_mean(members.iter().map(|f| f.ev_ebitda), caps.ev_ebitda),
            avg_roic: eligible_mean(members.iter().map(|f| f.roic), caps.roic),
            avg_roe: eligible_mean(members.iter().map(|f| f.roe), caps.roe),
            avg_debt_equity: eligible_mean(members.iter().map(|f| f.debt_equity), caps.debt_equity),
            avg_gross_margin: eligible_mean(members.iter().map(|f| f.gross_margin), caps.margin),
            avg_operating_margin: eligible_mean(
                members.iter().map(|f| f.operating_margin),
                caps.margin,
            ),
            avg_net_margin: eligible_mean(members.iter().map(|f| f.net_margin), caps.margin),
            stock_count: members.len(),
        }
    }
}

impl Default for SectorBenchmarkCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn eligible_mean(values: impl Iterator<Item = Option<Decimal>>, cap: f64) -> Option<f64> {
    let eligible: Vec<f64> = values
        .filter_map(ratio_f64)
        .filter(|&v| v > 0.0 && v <= cap)
        .collect();
    mean_opt(&eligible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn instrument(ticker: &str, sector: Option<&str>, fundamentals: Fundamentals) -> InstrumentFundamentals {
        InstrumentFundamentals {
            ticker: ticker.to_string(),
            sector: sector.map(str::to_string),
            fundamentals,
        }
    }

    fn with_pe(pe: Decimal) -> Fundamentals {
        Fundamentals {
            pe_ratio: Some(pe),
            ..Default::default()
        }
    }

    #[test]
    fn test_outliers_are_excluded_not_clamped() {
        let population = vec![
            instrument("A", Some("Tech"), with_pe(dec!(10))),
            instrument("B", Some("Tech"), with_pe(dec!(20))),
            instrument("C", Some("Tech"), with_pe(dec!(150))),
        ];
        let benchmarks = SectorBenchmarkCalculator::new().calculate(&population);
        let tech = &benchmarks["Tech"];

        // 150 is dropped entirely; clamping would give (10 + 20 + 100) / 3
        assert_eq!(tech.avg_pe, Some(15.0));
        assert_eq!(tech.stock_count, 3);
    }

    #[test]
    fn test_missing_metric_is_none_not_zero() {
        let population = vec![
            instrument("A", Some("Tech"), with_pe(dec!(10))),
            instrument("B", Some("Tech"), with_pe(dec!(30))),
        ];
        let benchmarks = SectorBenchmarkCalculator::new().calculate(&population);
        let tech = &benchmarks["Tech"];

        assert_eq!(tech.avg_roic, None);
        assert_eq!(tech.avg_net_margin, None);
        assert_eq!(tech.avg_pe, Some(20.0));
    }

    #[test]
    fn test_non_positive_values_excluded() {
        let population = vec![
            instrument(
                "A",
                Some("Energy"),
                Fundamentals {
                    pe_ratio: Some(dec!(-5)),
                    debt_equity: Some(dec!(0)),
                    roe: Some(dec!(12)),
                    ..Default::default()
                },
            ),
            instrument(
                "B",
                Some("Energy"),
                Fundamentals {
                    pe_ratio: Some(dec!(0)),
                    debt_equity: Some(dec!(6)),
                    roe: Some(dec!(250)),
                    ..Default::default()
                },
            ),
        ];
        let benchmarks = SectorBenchmarkCalculator::new().calculate(&population);
        let energy = &benchmarks["Energy"];

        assert_eq!(energy.avg_pe, None);
        assert_eq!(energy.avg_debt_equity, None);
        assert_eq!(energy.avg_roe, Some(12.0));
    }

    #[test]
    fn test_cap_is_inclusive() {
        let population = vec![
            instrument(
                "A",
                Some("Utilities"),
                Fundamentals {
                    debt_equity: Some(dec!(5)),
                    gross_margin: Some(dec!(100)),
                    ..Default::default()
                },
            ),
            instrument(
                "B",
                Some("Utilities"),
                Fundamentals {
                    debt_equity: Some(dec!(1)),
                    gross_margin: Some(dec!(40)),
                    ..Default::default()
                },
            ),
        ];
        let benchmarks = SectorBenchmarkCalculator::new().calculate(&population);
        let utilities = &benchmarks["Utilities"];

        assert_eq!(utilities.avg_debt_equity, Some(3.0));
        assert_eq!(utilities.avg_gross_margin, Some(70.0));
    }

    #[test]
    fn test_groups_by_sector_and_skips_unassigned() {
        let population = vec![
            instrument("A", Some("Tech"), with_pe(dec!(10))),
            instrument("B", Some("Health"), with_pe(dec!(30))),
            instrument("C", None, with_pe(dec!(50))),
        ];
        let benchmarks = SectorBenchmarkCalculator::new().calculate(&population);

        assert_eq!(benchmarks.len(), 2);
        assert_eq!(benchmarks["Health"].avg_pe, Some(30.0));
        assert_eq!(benchmarks["Health"].stock_count, 1);
        assert!(!benchmarks.contains_key(""));
    }

    #[test]
    fn test_custom_caps() {
        let caps = MetricCaps {
            pe: 50.0,
            ..MetricCaps::default()
        };
        let population = vec![
            instrument("A", Some("Tech"), with_pe(dec!(40))),
            instrument("B", Some("Tech"), with_pe(dec!(60))),
        ];
        let benchmarks = SectorBenchmarkCalculator::with_caps(caps).calculate(&population);
        assert_eq!(benchmarks["Tech"].avg_pe, Some(40.0));
    }
}
