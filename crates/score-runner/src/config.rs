use analysis_core::HistoryPeriod;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    // Database
    pub database_url: String,

    // Prices
    pub use_live_prices: bool,             // Yahoo chart data, synthetic on failure
    pub price_history_period: HistoryPeriod, // 1y

    // History
    pub history_retention_days: u32,       // 90
    pub movers_lookback_days: u32,         // 7
    pub movers_limit: usize,               // 10
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            database_url: var("DATABASE_URL", "sqlite:scores.db"),
            use_live_prices: var("USE_LIVE_PRICES", "false").parse()?,
            price_history_period: var("PRICE_HISTORY_PERIOD", "1y").parse()?,
            history_retention_days: var("HISTORY_RETENTION_DAYS", "90").parse()?,
            movers_lookback_days: var("MOVERS_LOOKBACK_DAYS", "7").parse()?,
            movers_limit: var("MOVERS_LIMIT", "10").parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.history_retention_days == 0 {
            bail!("HISTORY_RETENTION_DAYS must be at least 1");
        }
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<RunnerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunnerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite:scores.db");
        assert!(!config.use_live_prices);
        assert_eq!(config.price_history_period, HistoryPeriod::OneYear);
        assert_eq!(config.history_retention_days, 90);
        assert_eq!(config.movers_lookback_days, 7);
        assert_eq!(config.movers_limit, 10);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("USE_LIVE_PRICES", "true"),
            ("PRICE_HISTORY_PERIOD", "6mo"),
            ("HISTORY_RETENTION_DAYS", "30"),
        ])
        .unwrap();
        assert!(config.use_live_prices);
        assert_eq!(config.price_history_period, HistoryPeriod::SixMonths);
        assert_eq!(config.history_retention_days, 30);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config_from(&[("HISTORY_RETENTION_DAYS", "0")]).is_err());
        assert!(config_from(&[("PRICE_HISTORY_PERIOD", "10y")]).is_err());
        assert!(config_from(&[("MOVERS_LIMIT", "many")]).is_err());
    }
}
