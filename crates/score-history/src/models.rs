use std::fmt;
use std::str::FromStr;

use analysis_core::{AnalysisError, ScoreHistoryEntry, ScoreSnapshot, Signal};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The five scored fields shared by current snapshots and history entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreValues {
    pub total_score: f64,
    pub value_score: f64,
    pub quality_score: f64,
    pub momentum_score: f64,
    pub health_score: f64,
    pub signal: Signal,
}

impl From<&ScoreSnapshot> for ScoreValues {
    fn from(s: &ScoreSnapshot) -> Self {
        Self {
            total_score: s.total_score,
            value_score: s.value_score,
            quality_score: s.quality_score,
            momentum_score: s.momentum_score,
            health_score: s.health_score,
            signal: s.signal,
        }
    }
}

impl From<&ScoreHistoryEntry> for ScoreValues {
    fn from(e: &ScoreHistoryEntry) -> Self {
        Self {
            total_score: e.total_score,
            value_score: e.value_score,
            quality_score: e.quality_score,
            momentum_score: e.momentum_score,
            health_score: e.health_score,
            signal: e.signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalScore {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub scores: ScoreValues,
}

/// Current minus historical, per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDeltas {
    pub total_score: f64,
    pub value_score: f64,
    pub quality_score: f64,
    pub momentum_score: f64,
    pub health_score: f64,
    pub signal_changed: bool,
}

impl ScoreDeltas {
    pub fn between(current: &ScoreValues, historical: &ScoreValues) -> Self {
        Self {
            total_score: current.total_score - historical.total_score,
            value_score: current.value_score - historical.value_score,
            quality_score: current.quality_score - historical.quality_score,
            momentum_score: current.momentum_score - historical.momentum_score,
            health_score: current.health_score - historical.health_score,
            signal_changed: current.signal != historical.signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub ticker: String,
    pub period_days: u32,
    pub current: ScoreValues,
    pub historical: HistoricalScore,
    pub changes: ScoreDeltas,
    /// Total-score change relative to the historical total, rounded to 2 places.
    /// `None` when the historical total is zero.
    pub percent_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMover {
    pub ticker: String,
    pub sector: Option<String>,
    pub current_score: f64,
    pub historical_score: f64,
    pub score_change: f64,
    pub percent_change: Option<f64>,
    pub current_signal: Signal,
    pub historical_signal: Signal,
    pub signal_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalChange {
    pub ticker: String,
    pub sector: Option<String>,
    pub previous_signal: Signal,
    pub current_signal: Signal,
    pub score_change: f64,
    pub current_score: f64,
    pub historical_score: f64,
    /// Date of the historical entry the current signal is compared against.
    pub change_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoverDirection {
    Up,
    Down,
}

impl FromStr for MoverDirection {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MoverDirection::Up),
            "down" => Ok(MoverDirection::Down),
            other => Err(AnalysisError::InvalidInput(format!(
                "unknown mover direction '{}', expected 'up' or 'down'",
                other
            ))),
        }
    }
}

impl fmt::Display for MoverDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoverDirection::Up => f.write_str("up"),
            MoverDirection::Down => f.write_str("down"),
        }
    }
}

pub(crate) fn percent_change(change: f64, historical_total: f64) -> Option<f64> {
    if historical_total == 0.0 {
        return None;
    }
    Some((change / historical_total * 100.0 * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("up".parse::<MoverDirection>().unwrap(), MoverDirection::Up);
        assert_eq!("down".parse::<MoverDirection>().unwrap(), MoverDirection::Down);
        assert!(matches!(
            "sideways".parse::<MoverDirection>(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(5.0, 40.0), Some(12.5));
        assert_eq!(percent_change(-10.0, 30.0), Some(-33.33));
        assert_eq!(percent_change(12.0, 0.0), None);
    }
}
