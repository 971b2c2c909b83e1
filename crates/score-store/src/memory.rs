//! In-process repository for tests and dry runs.

use std::collections::BTreeMap;

use analysis_core::{
    AnalysisError, InstrumentFundamentals, ScoreHistoryEntry, ScoreSnapshot, ScoringRepository, SectorBenchmark,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryRepository {
    fundamentals: RwLock<BTreeMap<String, InstrumentFundamentals>>,
    benchmarks: RwLock<BTreeMap<String, SectorBenchmark>>,
    snapshots: RwLock<BTreeMap<String, ScoreSnapshot>>,
    history: RwLock<BTreeMap<(String, NaiveDate), ScoreHistoryEntry>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_fundamentals(&self, item: InstrumentFundamentals) {
        self.fundamentals.write().await.insert(item.ticker.clone(), item);
    }
}

#[async_trait]
impl ScoringRepository for MemoryRepository {
    async fn list_fundamentals(&self) -> Result<Vec<InstrumentFundamentals>, AnalysisError> {
        Ok(self.fundamentals.read().await.values().cloned().collect())
    }

    async fn put_sector_benchmark(&self, benchmark: &SectorBenchmark) -> Result<(), AnalysisError> {
        self.benchmarks
            .write()
            .await
            .insert(benchmark.sector.clone(), benchmark.clone());
        Ok(())
    }

    async fn list_sector_benchmarks(&self) -> Result<Vec<SectorBenchmark>, AnalysisError> {
        Ok(self.benchmarks.read().await.values().cloned().collect())
    }

    async fn put_score_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<(), AnalysisError> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.ticker.clone(), snapshot.clone());
        Ok(())
    }

    async fn get_score_snapshot(&self, ticker: &str) -> Result<Option<ScoreSnapshot>, AnalysisError> {
        Ok(self.snapshots.read().await.get(ticker).cloned())
    }

    async fn list_score_snapshots(&self) -> Result<Vec<ScoreSnapshot>, AnalysisError> {
        Ok(self.snapshots.read().await.values().cloned().collect())
    }

    async fn get_history_entry(
        &self,
        ticker: &str,
        snapshot_date: NaiveDate,
    ) -> Result<Option<ScoreHistoryEntry>, AnalysisError> {
        let history = self.history.read().await;
        Ok(history.get(&(ticker.to_string(), snapshot_date)).cloned())
    }

    async fn put_history_entry(&self, entry: &ScoreHistoryEntry) -> Result<bool, AnalysisError> {
        let key = (entry.ticker.clone(), entry.snapshot_date);
        let previous = self.history.write().await.insert(key, entry.clone());
        Ok(previous.is_none())
    }

    async fn list_history_since(
        &self,
        ticker: &str,
        since: NaiveDate,
    ) -> Result<Vec<ScoreHistoryEntry>, AnalysisError> {
        let history = self.history.read().await;
        Ok(history
            .range((ticker.to_string(), since)..=(ticker.to_string(), NaiveDate::MAX))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn latest_history_at_or_before(
        &self,
        ticker: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<ScoreHistoryEntry>, AnalysisError> {
        let history = self.history.read().await;
        Ok(history
            .range((ticker.to_string(), NaiveDate::MIN)..=(ticker.to_string(), on_or_before))
            .next_back()
            .map(|(_, entry)| entry.clone()))
    }

    async fn latest_history_for_all_at_or_before(
        &self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ScoreHistoryEntry>, AnalysisError> {
        let history = self.history.read().await;
        let mut latest: BTreeMap<&str, &ScoreHistoryEntry> = BTreeMap::new();
        // Keys are ordered by (ticker, date), so later dates overwrite earlier ones.
        for ((ticker, date), entry) in history.iter() {
            if *date <= on_or_before {
                latest.insert(ticker.as_str(), entry);
            }
        }
        Ok(latest.into_values().cloned().collect())
    }

    async fn delete_history_before(&self, cutoff: NaiveDate) -> Result<u64, AnalysisError> {
        let mut history = self.history.write().await;
        let before = history.len();
        history.retain(|(_, date), _| *date >= cutoff);
        Ok((before - history.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Fundamentals, Signal};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn entry(ticker: &str, date: NaiveDate, total: f64) -> ScoreHistoryEntry {
        ScoreHistoryEntry {
            ticker: ticker.to_string(),
            snapshot_date: date,
            total_score: total,
            value_score: 0.0,
            quality_score: 0.0,
            momentum_score: 0.0,
            health_score: 0.0,
            signal: Signal::from_total_score(total),
        }
    }

    #[tokio::test]
    async fn test_fundamentals_replace_by_ticker() {
        let repo = MemoryRepository::new();
        let item = InstrumentFundamentals {
            ticker: "ACME".to_string(),
            sector: Some("Tech".to_string()),
            fundamentals: Fundamentals::default(),
        };
        repo.upsert_fundamentals(item.clone()).await;
        repo.upsert_fundamentals(InstrumentFundamentals {
            sector: Some("Energy".to_string()),
            ..item
        })
        .await;

        let listed = repo.list_fundamentals().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sector.as_deref(), Some("Energy"));
    }

    #[tokio::test]
    async fn test_history_put_and_ranges() {
        let repo = MemoryRepository::new();
        assert!(repo.put_history_entry(&entry("AAA", day(1), 40.0)).await.unwrap());
        assert!(!repo.put_history_entry(&entry("AAA", day(1), 42.0)).await.unwrap());
        repo.put_history_entry(&entry("AAA", day(4), 50.0)).await.unwrap();
        repo.put_history_entry(&entry("AAB", day(2), 80.0)).await.unwrap();

        let since = repo.list_history_since("AAA", day(1)).await.unwrap();
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].total_score, 42.0);

        let latest = repo.latest_history_at_or_before("AAA", day(3)).await.unwrap().unwrap();
        assert_eq!(latest.snapshot_date, day(1));

        let all = repo.latest_history_for_all_at_or_before(day(5)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].snapshot_date, day(4));
        assert_eq!(all[1].ticker, "AAB");

        assert_eq!(repo.delete_history_before(day(2)).await.unwrap(), 1);
        assert!(repo.get_history_entry("AAA", day(1)).await.unwrap().is_none());
    }
}
