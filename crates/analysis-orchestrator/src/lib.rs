use std::collections::HashMap;
use std::sync::Arc;

use analysis_core::{
    AnalysisError, Fundamentals, HistoryPeriod, PriceSource, ScoreBreakdown, ScoreSnapshot, ScoringRepository,
    SectorBenchmark, Signal, TechnicalIndicatorSet,
};
use chrono::NaiveDate;
use fundamental_analysis::{ScoringEngine, SectorBenchmarkCalculator};
use score_history::ScoreHistoryTracker;
use serde::{Deserialize, Serialize};
use technical_analysis::IndicatorCalculator;

pub mod leaderboard;
pub mod screener;
pub use leaderboard::{rank_snapshots, LeaderboardEntry, LeaderboardFilters};
pub use screener::{
    screen, MetricRange, ScreenMetric, ScreenerCriteria, ScreenerMatch, ScreenerResponse, ScreenerStrategy,
    SortOrder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    pub sectors_analyzed: usize,
    pub scored_count: usize,
}

/// Runs the batch pipeline: benchmarks, then scores, then history snapshots.
///
/// A pass is meant to run as the only writer of benchmarks and snapshots; two
/// concurrent passes can score against half-written benchmarks.
pub struct ScoringOrchestrator {
    repository: Arc<dyn ScoringRepository>,
    price_source: Option<Arc<dyn PriceSource>>,
    period: HistoryPeriod,
    benchmark_calculator: SectorBenchmarkCalculator,
    indicator_calculator: IndicatorCalculator,
}

impl ScoringOrchestrator {
    pub fn new(repository: Arc<dyn ScoringRepository>) -> Self {
        Self {
            repository,
            price_source: None,
            period: HistoryPeriod::OneYear,
            benchmark_calculator: SectorBenchmarkCalculator::new(),
            indicator_calculator: IndicatorCalculator::new(),
        }
    }

    /// Score momentum from `source` instead of the neutral fallback.
    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>, period: HistoryPeriod) -> Self {
        self.price_source = Some(source);
        self.period = period;
        self
    }

    pub fn repository(&self) -> Arc<dyn ScoringRepository> {
        Arc::clone(&self.repository)
    }

    /// History tracker over the same repository.
    pub fn history(&self) -> ScoreHistoryTracker {
        ScoreHistoryTracker::new(self.repository())
    }

    /// Recompute and overwrite every sector benchmark.
    pub async fn calculate_sector_benchmarks(&self) -> Result<HashMap<String, SectorBenchmark>, AnalysisError> {
        let population = self.repository.list_fundamentals().await?;
        let benchmarks = self.benchmark_calculator.calculate(&population);

        for benchmark in benchmarks.values() {
            self.repository.put_sector_benchmark(benchmark).await?;
        }

        tracing::info!(
            "Calculated benchmarks for {} sectors from {} instruments",
            benchmarks.len(),
            population.len()
        );
        Ok(benchmarks)
    }

    /// Benchmarks as last persisted, without recomputing.
    pub async fn cached_sector_benchmarks(&self) -> Result<HashMap<String, SectorBenchmark>, AnalysisError> {
        Ok(self
            .repository
            .list_sector_benchmarks()
            .await?
            .into_iter()
            .map(|b| (b.sector.clone(), b))
            .collect())
    }

    /// Score one instrument against the stored population and cached benchmarks.
    pub async fn score_one(
        &self,
        fundamentals: &Fundamentals,
        sector: Option<&str>,
        indicators: Option<&TechnicalIndicatorSet>,
    ) -> Result<ScoreBreakdown, AnalysisError> {
        let population = self.repository.list_fundamentals().await?;
        let engine = ScoringEngine::new(&population, self.cached_sector_benchmarks().await?);
        Ok(engine.score(fundamentals, sector, indicators))
    }

    /// Score every instrument with fundamentals and overwrite its snapshot.
    /// Returns the number of instruments scored.
    pub async fn score_all(&self) -> Result<usize, AnalysisError> {
        let population = self.repository.list_fundamentals().await?;
        let engine = ScoringEngine::new(&population, self.cached_sector_benchmarks().await?);
        tracing::debug!("ROIC baseline for this pass: {:?}", engine.baseline());

        let mut scored = 0;
        for instrument in &population {
            let indicators = self.momentum_indicators(&instrument.ticker).await;
            let sector = instrument.sector.as_deref();
            let breakdown = engine.score(&instrument.fundamentals, sector, indicators.as_ref());

            let snapshot = ScoreSnapshot::from_breakdown(&instrument.ticker, sector, &breakdown);
            self.repository.put_score_snapshot(&snapshot).await?;
            scored += 1;
        }

        tracing::info!("Scored {} instruments", scored);
        Ok(scored)
    }

    /// Benchmarks followed by scores.
    pub async fn recompute(&self) -> Result<RecomputeSummary, AnalysisError> {
        let benchmarks = self.calculate_sector_benchmarks().await?;
        let scored_count = self.score_all().await?;
        Ok(RecomputeSummary {
            sectors_analyzed: benchmarks.len(),
            scored_count,
        })
    }

    pub async fn snapshot_all(&self, date: Option<NaiveDate>) -> Result<usize, AnalysisError> {
        self.history().snapshot_all(date).await
    }

    /// Current snapshots ranked by total score.
    pub async fn leaderboard(
        &self,
        limit: usize,
        sector: Option<&str>,
        signal: Option<Signal>,
    ) -> Result<Vec<LeaderboardEntry>, AnalysisError> {
        let snapshots = self.repository.list_score_snapshots().await?;
        let filters = LeaderboardFilters {
            sector: sector.map(str::to_string),
            signal,
            limit,
        };
        Ok(rank_snapshots(&snapshots, &filters))
    }

    /// Screen stored fundamentals joined with current scores.
    pub async fn screen(&self, criteria: &ScreenerCriteria) -> Result<ScreenerResponse, AnalysisError> {
        let population = self.repository.list_fundamentals().await?;
        let snapshots = self.repository.list_score_snapshots().await?;
        let response = screen(&population, &snapshots, criteria)?;
        tracing::debug!(
            "Screen '{}' matched {} of {} instruments",
            response.criteria,
            response.total_matches,
            population.len()
        );
        Ok(response)
    }

    /// Run a preset screen, labelled with the strategy name.
    pub async fn screen_strategy(
        &self,
        strategy: ScreenerStrategy,
        limit: usize,
    ) -> Result<ScreenerResponse, AnalysisError> {
        let mut response = self.screen(&strategy.criteria(limit)).await?;
        response.strategy = Some(strategy.name().to_string());
        Ok(response)
    }

    /// Latest readings for `ticker`, or `None` when no usable price history exists.
    async fn momentum_indicators(&self, ticker: &str) -> Option<TechnicalIndicatorSet> {
        let source = self.price_source.as_ref()?;
        match source.fetch_history(ticker, self.period).await {
            Ok(bars) if !bars.is_empty() => Some(self.indicator_calculator.latest_from_bars(&bars)),
            Ok(_) => {
                tracing::warn!("Empty price history for {}, using neutral momentum", ticker);
                None
            }
            Err(e) => {
                tracing::warn!("Price history unavailable for {}: {}", ticker, e);
                None
            }
        }
    }
}
