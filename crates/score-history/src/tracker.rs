//! Daily score snapshots and the comparisons built on them.
//!
//! Every look-back resolves "N days ago" to the most recent history entry dated on
//! or before `today - N`. A ticker without such an entry has no change to report;
//! that is a normal outcome, not an error.

use std::collections::HashMap;
use std::sync::Arc;

use analysis_core::{AnalysisError, ScoreHistoryEntry, ScoreSnapshot, ScoringRepository};
use chrono::{Duration, NaiveDate, Utc};

use crate::models::{
    percent_change, HistoricalScore, MoverDirection, ScoreChange, ScoreDeltas, ScoreMover, ScoreValues, SignalChange,
};

pub struct ScoreHistoryTracker {
    repository: Arc<dyn ScoringRepository>,
    reference_date: Option<NaiveDate>,
}

impl ScoreHistoryTracker {
    pub fn new(repository: Arc<dyn ScoringRepository>) -> Self {
        Self {
            repository,
            reference_date: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn days_ago(&self, days: u32) -> NaiveDate {
        self.today() - Duration::days(i64::from(days))
    }

    /// Copy every current snapshot into history for `date` (default today).
    /// Returns how many entries were newly created; same-day reruns update in place.
    pub async fn snapshot_all(&self, date: Option<NaiveDate>) -> Result<usize, AnalysisError> {
        let date = date.unwrap_or_else(|| self.today());
        let snapshots = self.repository.list_score_snapshots().await?;

        let mut created = 0;
        for snapshot in &snapshots {
            let entry = ScoreHistoryEntry::from_snapshot(snapshot, date);
            if self.repository.put_history_entry(&entry).await? {
                created += 1;
            }
        }

        tracing::info!(
            "Snapshot for {}: {} new, {} updated",
            date,
            created,
            snapshots.len() - created
        );
        Ok(created)
    }

    /// Entries from the last `days` days, oldest first.
    pub async fn get_history(&self, ticker: &str, days: u32) -> Result<Vec<ScoreHistoryEntry>, AnalysisError> {
        self.repository.list_history_since(ticker, self.days_ago(days)).await
    }

    pub async fn get_change(&self, ticker: &str, days: u32) -> Result<Option<ScoreChange>, AnalysisError> {
        let Some(current) = self.repository.get_score_snapshot(ticker).await? else {
            return Ok(None);
        };
        let Some(historical) = self
            .repository
            .latest_history_at_or_before(ticker, self.days_ago(days))
            .await?
        else {
            return Ok(None);
        };

        let current_values = ScoreValues::from(&current);
        let historical_values = ScoreValues::from(&historical);
        let changes = ScoreDeltas::between(&current_values, &historical_values);

        Ok(Some(ScoreChange {
            ticker: ticker.to_string(),
            period_days: days,
            current: current_values,
            historical: HistoricalScore {
                date: historical.snapshot_date,
                scores: historical_values,
            },
            percent_change: percent_change(changes.total_score, historical.total_score),
            changes,
        }))
    }

    pub async fn get_top_movers(
        &self,
        days: u32,
        limit: usize,
        direction: MoverDirection,
    ) -> Result<Vec<ScoreMover>, AnalysisError> {
        let mut movers: Vec<ScoreMover> = self
            .paired(days)
            .await?
            .into_iter()
            .map(|(current, historical)| {
                let change = current.total_score - historical.total_score;
                ScoreMover {
                    percent_change: percent_change(change, historical.total_score),
                    ticker: current.ticker,
                    sector: current.sector,
                    current_score: current.total_score,
                    historical_score: historical.total_score,
                    score_change: change,
                    current_signal: current.signal,
                    historical_signal: historical.signal,
                    signal_changed: current.signal != historical.signal,
                }
            })
            .collect();

        // Stable sort keeps ticker order among equal changes.
        match direction {
            MoverDirection::Up => movers.sort_by(|a, b| b.score_change.total_cmp(&a.score_change)),
            MoverDirection::Down => movers.sort_by(|a, b| a.score_change.total_cmp(&b.score_change)),
        }
        movers.truncate(limit);
        Ok(movers)
    }

    pub async fn get_signal_changes(&self, days: u32) -> Result<Vec<SignalChange>, AnalysisError> {
        Ok(self
            .paired(days)
            .await?
            .into_iter()
            .filter(|(current, historical)| current.signal != historical.signal)
            .map(|(current, historical)| SignalChange {
                score_change: current.total_score - historical.total_score,
                ticker: current.ticker,
                sector: current.sector,
                previous_signal: historical.signal,
                current_signal: current.signal,
                current_score: current.total_score,
                historical_score: historical.total_score,
                change_date: historical.snapshot_date,
            })
            .collect())
    }

    /// Delete entries dated before `today - keep_days`.
    pub async fn cleanup(&self, keep_days: u32) -> Result<u64, AnalysisError> {
        let cutoff = self.days_ago(keep_days);
        let deleted = self.repository.delete_history_before(cutoff).await?;
        tracing::info!("Removed {} history entries older than {}", deleted, cutoff);
        Ok(deleted)
    }

    /// Current snapshot joined with its qualifying history entry, in ticker order.
    /// Tickers missing either side are left out.
    async fn paired(&self, days: u32) -> Result<Vec<(ScoreSnapshot, ScoreHistoryEntry)>, AnalysisError> {
        let mut current: HashMap<String, ScoreSnapshot> = self
            .repository
            .list_score_snapshots()
            .await?
            .into_iter()
            .map(|s| (s.ticker.clone(), s))
            .collect();

        let mut historical = self
            .repository
            .latest_history_for_all_at_or_before(self.days_ago(days))
            .await?;
        historical.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        Ok(historical
            .into_iter()
            .filter_map(|entry| current.remove(&entry.ticker).map(|snapshot| (snapshot, entry)))
            .collect())
    }
}
