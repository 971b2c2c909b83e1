//! Momentum sub-score (0-25) from the latest technical readings.
//!
//! Four independent scales are summed. The moving-average and volume scales are
//! non-monotonic: an overextended move scores below a healthy one.

use analysis_core::{ComponentScore, MomentumDetail, MomentumSignal, TechnicalIndicatorSet, Tier, TierTable};

/// Price vs 50-day MA, max 7. Peaks at +5..+10%.
pub const PRICE_VS_SMA50: TierTable<7> = TierTable::new(
    [
        Tier::at_least(10.0, 4.0),
        Tier::at_least(5.0, 7.0),
        Tier::at_least(2.0, 6.0),
        Tier::at_least(0.0, 4.5),
        Tier::at_least(-2.0, 3.0),
        Tier::at_least(-5.0, 2.0),
        Tier::at_least(-10.0, 1.0),
    ],
    0.0,
);

/// Price vs 200-day MA, max 7. Peaks at +10..+20%.
pub const PRICE_VS_SMA200: TierTable<7> = TierTable::new(
    [
        Tier::at_least(20.0, 5.0),
        Tier::at_least(10.0, 7.0),
        Tier::at_least(5.0, 6.0),
        Tier::at_least(0.0, 4.5),
        Tier::at_least(-5.0, 3.0),
        Tier::at_least(-10.0, 2.0),
        Tier::at_least(-20.0, 1.0),
    ],
    0.0,
);

/// RSI, max 6. Best in the 40-60 band, penalised at both extremes.
pub const RSI: TierTable<6> = TierTable::new(
    [
        Tier::at_least(80.0, 1.0),
        Tier::at_least(70.0, 3.0),
        Tier::at_least(60.0, 5.0),
        Tier::at_least(40.0, 6.0),
        Tier::at_least(30.0, 5.0),
        Tier::at_least(20.0, 3.0),
    ],
    1.0,
);

/// Volume vs 20-day average, max 5. A blow-off spike scores below steady interest.
pub const VOLUME_TREND: TierTable<6> = TierTable::new(
    [
        Tier::at_least(100.0, 4.0),
        Tier::at_least(50.0, 5.0),
        Tier::at_least(20.0, 4.0),
        Tier::at_least(0.0, 3.0),
        Tier::at_least(-20.0, 2.0),
        Tier::at_least(-50.0, 1.0),
    ],
    0.0,
);

pub struct MomentumScorer;

impl MomentumScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, indicators: &TechnicalIndicatorSet) -> MomentumDetail {
        let components = vec![
            ComponentScore::new(
                "Price vs 50-day MA",
                PRICE_VS_SMA50.score(indicators.price_vs_sma50),
                7.0,
            )
            .with_value(indicators.price_vs_sma50),
            ComponentScore::new(
                "Price vs 200-day MA",
                PRICE_VS_SMA200.score(indicators.price_vs_sma200),
                7.0,
            )
            .with_value(indicators.price_vs_sma200),
            ComponentScore::new("RSI", RSI.score(indicators.rsi), 6.0).with_value(indicators.rsi),
            ComponentScore::new(
                "Volume Trend",
                VOLUME_TREND.score(indicators.volume_trend),
                5.0,
            )
            .with_value(indicators.volume_trend),
        ];

        let score: f64 = components.iter().map(|c| c.score).sum();
        let signal = MomentumSignal::from_score(score);
        let explanation = explain(signal, indicators);

        MomentumDetail {
            score,
            signal,
            components,
            indicators: *indicators,
            explanation,
        }
    }
}

impl Default for MomentumScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn explain(signal: MomentumSignal, indicators: &TechnicalIndicatorSet) -> String {
    let intro = match signal {
        MomentumSignal::Strong => "Strong positive momentum with favorable technical indicators.",
        MomentumSignal::Positive => "Positive momentum with most indicators supporting uptrend.",
        MomentumSignal::Neutral => "Mixed momentum signals - no clear trend.",
        MomentumSignal::Negative => "Negative momentum with technical weakness.",
        MomentumSignal::Weak => "Weak momentum with concerning technical indicators.",
    };

    let mut observations = Vec::new();

    let vs_50 = indicators.price_vs_sma50;
    if vs_50 >= 5.0 {
        observations.push(format!("price {:.1}% above 50-day MA (strong uptrend)", vs_50));
    } else if vs_50 <= -5.0 {
        observations.push(format!("price {:.1}% below 50-day MA (downtrend)", vs_50.abs()));
    }

    let rsi = indicators.rsi;
    if rsi >= 70.0 {
        observations.push(format!("RSI at {:.0} (overbought)", rsi));
    } else if rsi <= 30.0 {
        observations.push(format!("RSI at {:.0} (oversold)", rsi));
    }

    let volume = indicators.volume_trend;
    if volume >= 50.0 {
        observations.push(format!("volume {:.0}% above average (strong interest)", volume));
    } else if volume <= -30.0 {
        observations.push(format!("volume {:.0}% below average (low interest)", volume.abs()));
    }

    if observations.is_empty() {
        return intro.to_string();
    }

    let joined = observations
        .into_iter()
        .take(3)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} {}.", intro, capitalize_first(&joined))
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
