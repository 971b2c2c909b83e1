use std::sync::Arc;

use analysis_core::{AnalysisError, Bar, HistoryPeriod, PriceSource};
use async_trait::async_trait;

/// Tries `primary` and falls back to `secondary` on any error.
pub struct FallbackPriceSource {
    primary: Arc<dyn PriceSource>,
    secondary: Arc<dyn PriceSource>,
}

impl FallbackPriceSource {
    pub fn new(primary: Arc<dyn PriceSource>, secondary: Arc<dyn PriceSource>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl PriceSource for FallbackPriceSource {
    async fn fetch_history(&self, ticker: &str, period: HistoryPeriod) -> Result<Vec<Bar>, AnalysisError> {
        match self.primary.fetch_history(ticker, period).await {
            Ok(bars) => Ok(bars),
            Err(e) => {
                tracing::warn!("Falling back to synthetic prices for {}: {}", ticker, e);
                self.secondary.fetch_history(ticker, period).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntheticPriceSource;

    struct Unreachable;

    #[async_trait]
    impl PriceSource for Unreachable {
        async fn fetch_history(&self, ticker: &str, _period: HistoryPeriod) -> Result<Vec<Bar>, AnalysisError> {
            Err(AnalysisError::ApiError(format!("no route to quotes for {}", ticker)))
        }
    }

    #[tokio::test]
    async fn test_falls_back_on_error() {
        let source = FallbackPriceSource::new(Arc::new(Unreachable), Arc::new(SyntheticPriceSource::new()));
        let bars = source.fetch_history("ACME", HistoryPeriod::OneMonth).await.unwrap();
        assert_eq!(bars.len(), 30);
    }

    #[tokio::test]
    async fn test_secondary_error_propagates() {
        let source = FallbackPriceSource::new(Arc::new(Unreachable), Arc::new(Unreachable));
        let result = source.fetch_history("ACME", HistoryPeriod::OneMonth).await;
        assert!(matches!(result, Err(AnalysisError::ApiError(_))));
    }
}
