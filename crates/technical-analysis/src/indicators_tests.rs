#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use analysis_core::Bar;
    use chrono::Utc;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    // Helper function to create bars from closes and volumes
    fn bars_from(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
        let n = closes.len();
        closes
            .iter()
            .zip(volumes.iter())
            .enumerate()
            .map(|(i, (&close, &volume))| Bar {
                timestamp: Utc::now() - chrono::Duration::days((n - i) as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume,
                vwap: None,
            })
            .collect()
    }

    fn rising_bars(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let volumes = vec![1_000_000.0; n];
        bars_from(&closes, &volumes)
    }

    #[test]
    fn test_rolling_mean_min_periods() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = rolling_mean(&data, 3);

        assert_eq!(result.len(), 5);
        assert!((result[0] - 1.0).abs() < 0.001); // only one value so far
        assert!((result[1] - 1.5).abs() < 0.001);
        assert!((result[2] - 2.0).abs() < 0.001); // (1+2+3)/3
        assert!((result[3] - 3.0).abs() < 0.001);
        assert!((result[4] - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_rolling_mean_zero_window() {
        assert!(rolling_mean(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_rolling_mean_real_prices() {
        let prices = sample_prices();
        let result = rolling_mean(&prices, 5);

        assert_eq!(result.len(), prices.len());
        let expected = (44.34 + 44.09 + 44.15 + 43.61 + 44.33) / 5.0;
        assert!((result[4] - expected).abs() < 0.01);
    }

    #[test]
    fn test_rsi_bounds_and_length() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        assert_eq!(result.len(), prices.len());
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_known_value() {
        // gains [0, 2, 0], losses [0, 0, 1] -> RS = 2
        let result = rsi(&[10.0, 12.0, 11.0], 14);
        assert!((result[2] - 66.6667).abs() < 0.001);
    }

    #[test]
    fn test_rsi_uptrend_near_100() {
        let uptrend: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&uptrend, 14);
        assert!(*result.last().unwrap() > 99.9);
    }

    #[test]
    fn test_rsi_downtrend_is_zero() {
        let downtrend: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&downtrend, 14);
        assert!(result.last().unwrap().abs() < 0.001);
    }

    #[test]
    fn test_rsi_flat_reads_zero() {
        let flat = vec![50.0; 30];
        let result = rsi(&flat, 14);
        // no gains over an epsilon loss
        assert!(result.iter().all(|&v| v.abs() < 0.001));
    }

    #[test]
    fn test_single_bar_rsi_uses_epsilon_rule() {
        let bars = bars_from(&[50.0], &[1_000.0]);
        let latest = IndicatorCalculator::new().latest_from_bars(&bars);
        assert!(latest.rsi.abs() < 0.001);
        assert_eq!(latest.price, 50.0);
    }

    #[test]
    fn test_calculator_long_series() {
        let bars = rising_bars(250);
        let calc = IndicatorCalculator::new();
        let rows = calc.calculate(&bars);

        assert_eq!(rows.len(), 250);
        let last = rows.last().unwrap();
        // closes 300..=349: mean 324.5
        assert!((last.sma_50 - 324.5).abs() < 0.001);
        // closes 150..=349: mean 249.5
        assert!((last.sma_200 - 249.5).abs() < 0.001);
        assert!(last.price_vs_sma50 > 0.0);
        assert!(last.price_vs_sma200 > last.price_vs_sma50);
        assert!(last.volume_trend.abs() < 0.001);
    }

    #[test]
    fn test_calculator_short_series_uses_available_rows() {
        let bars = rising_bars(10);
        let calc = IndicatorCalculator::new();
        let rows = calc.calculate(&bars);

        let last = rows.last().unwrap();
        // 100..=109 averaged
        assert!((last.sma_200 - 104.5).abs() < 0.001);
        assert!((last.sma_50 - last.sma_200).abs() < 0.001);
        assert!(rows.iter().all(|r| r.sma_200.is_finite() && r.rsi.is_finite()));
    }

    #[test]
    fn test_volume_trend_spike() {
        let closes = vec![100.0; 20];
        let mut volumes = vec![1_000_000.0; 20];
        volumes[19] = 2_000_000.0;
        let bars = bars_from(&closes, &volumes);

        let latest = IndicatorCalculator::new().latest_from_bars(&bars);
        // average = 1.05M, so 2M is ~90.48% above
        assert!((latest.volume_trend - 90.476).abs() < 0.01);
        assert!((latest.volume_sma_20 - 1_050_000.0).abs() < 0.001);
    }

    #[test]
    fn test_latest_empty_is_neutral() {
        let calc = IndicatorCalculator::new();
        let latest = calc.latest_from_bars(&[]);

        assert_eq!(latest.rsi, 50.0);
        assert_eq!(latest.price, 0.0);
        assert_eq!(latest.price_vs_sma50, 0.0);
        assert_eq!(latest.volume_trend, 0.0);
    }

    #[test]
    fn test_zero_volume_has_flat_trend() {
        let closes = vec![10.0; 5];
        let volumes = vec![0.0; 5];
        let latest = IndicatorCalculator::new().latest_from_bars(&bars_from(&closes, &volumes));
        assert_eq!(latest.volume_trend, 0.0);
    }
}
