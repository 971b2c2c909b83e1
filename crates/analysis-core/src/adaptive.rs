//! Distribution helpers for population-relative scoring.
//!
//! Scores that rank an instrument against its peers (ROIC percentile, leaderboard
//! percentile) derive their cut points from the population itself rather than from
//! fixed constants.

use crate::AnalysisError;

fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Mean of the slice, or `None` when it is empty.
pub fn mean_opt(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(mean(data))
    }
}

/// Middle value; the average of the two middle values for even-length input.
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(data);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Cut points dividing `data` into `n` equal-probability intervals.
///
/// Uses the exclusive method (positions at `i * (len + 1) / n`, linearly
/// interpolated), returning `n - 1` values. Needs at least two data points.
pub fn quantiles_exclusive(data: &[f64], n: usize) -> Result<Vec<f64>, AnalysisError> {
    if n < 1 {
        return Err(AnalysisError::InvalidInput(
            "quantile count must be at least 1".to_string(),
        ));
    }
    if data.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "need at least 2 points for quantiles, got {}",
            data.len()
        )));
    }

    let sorted = sorted_copy(data);
    let len = sorted.len();
    let m = len + 1;
    let cuts = (1..n)
        .map(|i| {
            let j = (i * m / n).clamp(1, len - 1);
            let delta = (i * m) as f64 - (j * n) as f64;
            (sorted[j - 1] * (n as f64 - delta) + sorted[j] * delta) / n as f64
        })
        .collect();
    Ok(cuts)
}

/// Compute the percentile rank of `value` within `data` (returns 0.0 to 1.0).
/// Uses midpoint interpolation: ties count as half.
pub fn percentile_rank(value: f64, data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.5;
    }
    let count_below = data.iter().filter(|&&x| x < value).count();
    let count_equal = data.iter().filter(|&&x| (x - value).abs() < f64::EPSILON).count();
    (count_below as f64 + 0.5 * count_equal as f64) / data.len() as f64
}

/// Compute a specific percentile value from data (0-100 scale).
pub fn percentile_value(data: &[f64], pct: f64) -> Result<f64, AnalysisError> {
    if !(0.0..=100.0).contains(&pct) {
        return Err(AnalysisError::InvalidInput(format!(
            "percentile must be within 0-100, got {}",
            pct
        )));
    }
    if data.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "cannot take a percentile of an empty population".to_string(),
        ));
    }
    let sorted = sorted_copy(data);
    let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    Ok(sorted[idx.min(sorted.len() - 1)])
}
