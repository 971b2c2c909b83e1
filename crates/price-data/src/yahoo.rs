use analysis_core::{AnalysisError, Bar, HistoryPeriod, PriceSource};
use async_trait::async_trait;
use chrono::DateTime;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Daily bars from the Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooPriceSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooPriceSource {
    pub fn new() -> Self {
        Self::with_base_url(CHART_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for YahooPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    async fn fetch_history(&self, ticker: &str, period: HistoryPeriod) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!("{}/{}?range={}&interval=1d", self.base_url, ticker, period.as_str());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(format!("chart request for {} failed: {}", ticker, e)))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "chart request for {} returned {}",
                ticker,
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(format!("invalid chart response for {}: {}", ticker, e)))?;

        let bars = parse_chart(&json)?;
        if bars.is_empty() {
            return Err(AnalysisError::ApiError(format!("no price data returned for {}", ticker)));
        }

        tracing::info!("Fetched {} price records for {}", bars.len(), ticker);
        Ok(bars)
    }
}

fn missing(what: &str) -> AnalysisError {
    AnalysisError::ApiError(format!("chart response has no {}", what))
}

fn series<'a>(quotes: &'a serde_json::Value, name: &str) -> Result<&'a [serde_json::Value], AnalysisError> {
    quotes
        .get(name)
        .and_then(|v| v.as_array())
        .map(|arr| arr.as_slice())
        .ok_or_else(|| missing(name))
}

fn value_at(values: &[serde_json::Value], i: usize) -> Option<f64> {
    values.get(i).and_then(|v| v.as_f64())
}

/// Bars from a chart payload. Rows with any missing OHLCV value are skipped.
pub fn parse_chart(json: &serde_json::Value) -> Result<Vec<Bar>, AnalysisError> {
    let chart = json
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| missing("result"))?;

    let timestamps = chart
        .get("timestamp")
        .and_then(|v| v.as_array())
        .ok_or_else(|| missing("timestamps"))?;

    let quotes = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| missing("quote block"))?;

    let opens = series(quotes, "open")?;
    let highs = series(quotes, "high")?;
    let lows = series(quotes, "low")?;
    let closes = series(quotes, "close")?;
    let volumes = series(quotes, "volume")?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        if let (Some(ts), Some(o), Some(h), Some(l), Some(c), Some(v)) = (
            ts.as_i64(),
            value_at(opens, i),
            value_at(highs, i),
            value_at(lows, i),
            value_at(closes, i),
            value_at(volumes, i),
        ) {
            let timestamp = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| AnalysisError::ApiError(format!("invalid timestamp {}", ts)))?;
            bars.push(Bar {
                timestamp,
                open: o,
                high: h,
                low: l,
                close: c,
                volume: v,
                vwap: None,
            });
        }
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chart_skips_incomplete_rows() {
        let payload = json!({
            "chart": {
                "result": [{
                    "timestamp": [1717200000, 1717286400, 1717372800],
                    "indicators": {
                        "quote": [{
                            "open": [10.0, null, 12.0],
                            "high": [11.0, 12.5, 13.0],
                            "low": [9.5, 10.5, 11.5],
                            "close": [10.5, 12.0, 12.5],
                            "volume": [1000, 2000, 3000]
                        }]
                    }
                }]
            }
        });

        let bars = parse_chart(&payload).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.5);
        assert_eq!(bars[1].open, 12.0);
        assert_eq!(bars[1].volume, 3000.0);
        assert_eq!(bars[1].timestamp.timestamp(), 1717372800);
    }

    #[test]
    fn test_parse_chart_without_result_is_api_error() {
        let payload = json!({ "chart": { "result": null, "error": { "code": "Not Found" } } });
        assert!(matches!(parse_chart(&payload), Err(AnalysisError::ApiError(_))));
    }
}
