use analysis_core::adaptive::percentile_rank;
use analysis_core::{ScoreSnapshot, Signal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position after filtering.
    pub rank: usize,
    pub ticker: String,
    pub sector: Option<String>,
    pub total_score: f64,
    pub value_score: f64,
    pub quality_score: f64,
    pub momentum_score: f64,
    pub health_score: f64,
    pub signal: Signal,
    /// Standing within the whole scored population, 0-100.
    pub percentile: f64,
}

#[derive(Debug, Clone)]
pub struct LeaderboardFilters {
    pub sector: Option<String>,
    pub signal: Option<Signal>,
    pub limit: usize,
}

impl Default for LeaderboardFilters {
    fn default() -> Self {
        Self {
            sector: None,
            signal: None,
            limit: 10,
        }
    }
}

/// Rank snapshots by total score, highest first, ties broken by ticker.
///
/// Percentiles are taken against every snapshot passed in, before the filters
/// narrow the list.
pub fn rank_snapshots(snapshots: &[ScoreSnapshot], filters: &LeaderboardFilters) -> Vec<LeaderboardEntry> {
    let population: Vec<f64> = snapshots.iter().map(|s| s.total_score).collect();

    let mut candidates: Vec<&ScoreSnapshot> = snapshots
        .iter()
        .filter(|s| match &filters.sector {
            Some(sector) => s.sector.as_deref() == Some(sector.as_str()),
            None => true,
        })
        .filter(|s| filters.signal.map_or(true, |signal| s.signal == signal))
        .collect();

    candidates.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });

    candidates
        .into_iter()
        .take(filters.limit)
        .enumerate()
        .map(|(i, s)| LeaderboardEntry {
            rank: i + 1,
            ticker: s.ticker.clone(),
            sector: s.sector.clone(),
            total_score: s.total_score,
            value_score: s.value_score,
            quality_score: s.quality_score,
            momentum_score: s.momentum_score,
            health_score: s.health_score,
            signal: s.signal,
            percentile: (percentile_rank(s.total_score, &population) * 100.0).round(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(ticker: &str, sector: &str, total: f64) -> ScoreSnapshot {
        ScoreSnapshot {
            ticker: ticker.to_string(),
            sector: Some(sector.to_string()),
            total_score: total,
            value_score: 0.0,
            quality_score: 0.0,
            momentum_score: 0.0,
            health_score: 0.0,
            signal: Signal::from_total_score(total),
            calculated_at: Utc::now(),
        }
    }

    fn population() -> Vec<ScoreSnapshot> {
        vec![
            snapshot("DDD", "Energy", 40.0),
            snapshot("BBB", "Tech", 80.0),
            snapshot("AAA", "Tech", 80.0),
            snapshot("CCC", "Energy", 92.0),
        ]
    }

    #[test]
    fn test_ranked_descending_with_ticker_tiebreak() {
        let board = rank_snapshots(&population(), &LeaderboardFilters::default());
        let order: Vec<&str> = board.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(order, vec!["CCC", "AAA", "BBB", "DDD"]);
        let ranks: Vec<usize> = board.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_percentile_counts_half_of_ties() {
        let board = rank_snapshots(&population(), &LeaderboardFilters::default());
        // 92: 3 lower + 0.5 of itself over 4
        assert_eq!(board[0].percentile, 88.0);
        // 80: 1 lower + 0.5 * 2 tied over 4
        assert_eq!(board[1].percentile, 50.0);
        assert_eq!(board[2].percentile, 50.0);
        assert_eq!(board[3].percentile, 13.0);
    }

    #[test]
    fn test_filters_keep_population_percentile() {
        let filters = LeaderboardFilters {
            sector: Some("Energy".to_string()),
            ..Default::default()
        };
        let board = rank_snapshots(&population(), &filters);
        assert_eq!(board.len(), 2);
        assert_eq!(board[1].ticker, "DDD");
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[1].percentile, 13.0);

        let buys = LeaderboardFilters {
            signal: Some(Signal::Buy),
            limit: 1,
            ..Default::default()
        };
        let board = rank_snapshots(&population(), &buys);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].ticker, "AAA");
    }

    #[test]
    fn test_empty_population() {
        assert!(rank_snapshots(&[], &LeaderboardFilters::default()).is_empty());
    }
}
