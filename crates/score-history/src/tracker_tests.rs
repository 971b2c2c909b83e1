#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::super::tracker::*;
    use analysis_core::{AnalysisError, ScoreHistoryEntry, ScoreSnapshot, ScoringRepository, Signal};
    use chrono::{NaiveDate, Utc};
    use score_store::MemoryRepository;
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn snapshot(ticker: &str, total: f64) -> ScoreSnapshot {
        ScoreSnapshot {
            ticker: ticker.to_string(),
            sector: Some("Tech".to_string()),
            total_score: total,
            value_score: total / 4.0,
            quality_score: total / 4.0,
            momentum_score: total / 4.0,
            health_score: total / 4.0,
            signal: Signal::from_total_score(total),
            calculated_at: Utc::now(),
        }
    }

    fn entry(ticker: &str, date: NaiveDate, total: f64) -> ScoreHistoryEntry {
        ScoreHistoryEntry::from_snapshot(&snapshot(ticker, total), date)
    }

    async fn setup(
        current: &[(&str, f64)],
        history: &[(&str, NaiveDate, f64)],
    ) -> (Arc<MemoryRepository>, ScoreHistoryTracker) {
        let repo = Arc::new(MemoryRepository::new());
        for (ticker, total) in current {
            repo.put_score_snapshot(&snapshot(ticker, *total)).await.unwrap();
        }
        for (ticker, date, total) in history {
            repo.put_history_entry(&entry(ticker, *date, *total)).await.unwrap();
        }
        let tracker = ScoreHistoryTracker::new(repo.clone()).with_reference_date(today());
        (repo, tracker)
    }

    #[tokio::test]
    async fn test_snapshot_all_is_idempotent_per_day() {
        let (repo, tracker) = setup(&[("AAA", 60.0), ("BBB", 80.0)], &[]).await;

        assert_eq!(tracker.snapshot_all(None).await.unwrap(), 2);
        repo.put_score_snapshot(&snapshot("AAA", 65.0)).await.unwrap();
        assert_eq!(tracker.snapshot_all(None).await.unwrap(), 0);

        let history = tracker.get_history("AAA", 0).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].snapshot_date, today());
        assert_eq!(history[0].total_score, 65.0);
    }

    #[tokio::test]
    async fn test_snapshot_all_with_explicit_date() {
        let (_repo, tracker) = setup(&[("AAA", 60.0)], &[]).await;
        assert_eq!(tracker.snapshot_all(Some(day(10))).await.unwrap(), 1);
        assert_eq!(tracker.snapshot_all(Some(day(11))).await.unwrap(), 1);
        assert_eq!(tracker.get_history("AAA", 30).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_history_window_and_order() {
        let (_repo, tracker) = setup(
            &[("AAA", 60.0)],
            &[("AAA", day(25), 55.0), ("AAA", day(10), 40.0), ("AAA", day(28), 58.0)],
        )
        .await;

        let history = tracker.get_history("AAA", 7).await.unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|e| e.snapshot_date).collect();
        assert_eq!(dates, vec![day(25), day(28)]);
    }

    #[tokio::test]
    async fn test_get_change_uses_closest_before() {
        let (_repo, tracker) = setup(
            &[("AAA", 60.0)],
            &[("AAA", day(20), 40.0), ("AAA", day(22), 48.0), ("AAA", day(26), 59.0)],
        )
        .await;

        // today - 7 = June 23; June 26 is closer in absolute terms but after the cutoff
        let change = tracker.get_change("AAA", 7).await.unwrap().unwrap();
        assert_eq!(change.historical.date, day(22));
        assert_eq!(change.historical.scores.total_score, 48.0);
        assert_eq!(change.changes.total_score, 12.0);
        assert_eq!(change.changes.value_score, 3.0);
        assert_eq!(change.percent_change, Some(25.0));
        assert!(change.changes.signal_changed);
        assert_eq!(change.period_days, 7);
    }

    #[tokio::test]
    async fn test_get_change_none_without_history() {
        let (_repo, tracker) = setup(&[("AAA", 60.0)], &[("AAA", day(28), 50.0)]).await;
        assert!(tracker.get_change("AAA", 7).await.unwrap().is_none());
        assert!(tracker.get_change("ZZZ", 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_change_zero_historical_total() {
        let (_repo, tracker) = setup(&[("AAA", 10.0)], &[("AAA", day(1), 0.0)]).await;
        let change = tracker.get_change("AAA", 7).await.unwrap().unwrap();
        assert_eq!(change.percent_change, None);
        assert_eq!(change.changes.total_score, 10.0);
    }

    #[tokio::test]
    async fn test_top_movers_sorted_and_limited() {
        let (_repo, tracker) = setup(
            &[("AAA", 60.0), ("BBB", 45.0), ("CCC", 70.0), ("NEW", 90.0)],
            &[
                ("AAA", day(20), 50.0),
                ("BBB", day(21), 65.0),
                ("CCC", day(19), 68.0),
                ("NEW", day(29), 10.0),
            ],
        )
        .await;

        let up = tracker.get_top_movers(7, 10, MoverDirection::Up).await.unwrap();
        let changes: Vec<f64> = up.iter().map(|m| m.score_change).collect();
        assert_eq!(changes, vec![10.0, 2.0, -20.0]);
        assert!(up.iter().all(|m| m.ticker != "NEW"));

        let down = tracker.get_top_movers(7, 2, MoverDirection::Down).await.unwrap();
        assert_eq!(down.len(), 2);
        assert_eq!(down[0].ticker, "BBB");
        assert_eq!(down[0].score_change, -20.0);
        assert_eq!(down[1].ticker, "CCC");
        assert!(down[0].signal_changed);
        assert_eq!(down[0].sector.as_deref(), Some("Tech"));
    }

    #[tokio::test]
    async fn test_top_movers_limit_zero() {
        let (_repo, tracker) = setup(&[("AAA", 60.0)], &[("AAA", day(1), 50.0)]).await;
        assert!(tracker.get_top_movers(7, 0, MoverDirection::Up).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signal_changes() {
        let (_repo, tracker) = setup(
            &[("AAA", 76.0), ("BBB", 55.0), ("CCC", 40.0)],
            &[("AAA", day(20), 60.0), ("BBB", day(20), 52.0), ("CCC", day(20), 51.0)],
        )
        .await;

        let changes = tracker.get_signal_changes(7).await.unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].ticker, "AAA");
        assert_eq!(changes[0].previous_signal, Signal::Hold);
        assert_eq!(changes[0].current_signal, Signal::Buy);
        assert_eq!(changes[0].change_date, day(20));
        assert_eq!(changes[1].ticker, "CCC");
        assert_eq!(changes[1].current_signal, Signal::Sell);
        assert_eq!(changes[1].score_change, -11.0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_window() {
        let (_repo, tracker) = setup(
            &[],
            &[("AAA", day(1), 50.0), ("AAA", day(9), 50.0), ("AAA", day(10), 50.0), ("BBB", day(2), 50.0)],
        )
        .await;

        // cutoff = June 10; entries strictly before it go
        assert_eq!(tracker.cleanup(20).await.unwrap(), 3);
        assert_eq!(tracker.get_history("AAA", 30).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_change_serializes_flat_historical_scores() {
        let (_repo, tracker) = setup(&[("AAA", 60.0)], &[("AAA", day(1), 50.0)]).await;
        let change = tracker.get_change("AAA", 7).await.unwrap().unwrap();
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["historical"]["date"], "2024-06-01");
        assert_eq!(json["historical"]["total_score"], 50.0);
        assert_eq!(json["current"]["signal"], "HOLD");
    }

    #[test]
    fn test_bad_direction_is_invalid_input() {
        assert!(matches!(
            "left".parse::<MoverDirection>(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }
}
