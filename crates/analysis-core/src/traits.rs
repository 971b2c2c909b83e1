use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    AnalysisError, Bar, HistoryPeriod, InstrumentFundamentals, ScoreHistoryEntry, ScoreSnapshot, SectorBenchmark,
};

/// Storage for fundamentals, benchmarks, current scores and score history.
#[async_trait]
pub trait ScoringRepository: Send + Sync {
    /// Every instrument that has fundamentals, joined with its ticker and sector.
    async fn list_fundamentals(&self) -> Result<Vec<InstrumentFundamentals>, AnalysisError>;

    /// Insert or fully overwrite the benchmark row for `benchmark.sector`.
    async fn put_sector_benchmark(&self, benchmark: &SectorBenchmark) -> Result<(), AnalysisError>;

    async fn list_sector_benchmarks(&self) -> Result<Vec<SectorBenchmark>, AnalysisError>;

    /// Insert or overwrite the current score for `snapshot.ticker`.
    async fn put_score_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<(), AnalysisError>;

    async fn get_score_snapshot(&self, ticker: &str) -> Result<Option<ScoreSnapshot>, AnalysisError>;

    async fn list_score_snapshots(&self) -> Result<Vec<ScoreSnapshot>, AnalysisError>;

    async fn get_history_entry(
        &self,
        ticker: &str,
        snapshot_date: NaiveDate,
    ) -> Result<Option<ScoreHistoryEntry>, AnalysisError>;

    /// Insert or update the entry for (ticker, date). Returns `true` when a new row was created.
    async fn put_history_entry(&self, entry: &ScoreHistoryEntry) -> Result<bool, AnalysisError>;

    /// Entries for `ticker` dated on or after `since`, oldest first.
    async fn list_history_since(
        &self,
        ticker: &str,
        since: NaiveDate,
    ) -> Result<Vec<ScoreHistoryEntry>, AnalysisError>;

    /// Most recent entry for `ticker` dated on or before `on_or_before`.
    async fn latest_history_at_or_before(
        &self,
        ticker: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<ScoreHistoryEntry>, AnalysisError>;

    /// The same lookup for every ticker that has one.
    async fn latest_history_for_all_at_or_before(
        &self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ScoreHistoryEntry>, AnalysisError>;

    /// Delete entries dated strictly before `cutoff`; returns the number removed.
    async fn delete_history_before(&self, cutoff: NaiveDate) -> Result<u64, AnalysisError>;
}

/// Source of daily OHLCV history for a ticker.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Ascending daily bars covering `period` up to today.
    async fn fetch_history(&self, ticker: &str, period: HistoryPeriod) -> Result<Vec<Bar>, AnalysisError>;
}
