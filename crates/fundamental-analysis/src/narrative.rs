use analysis_core::Signal;

use crate::scoring::FactorScore;

const MAX_ENTRIES: usize = 5;

/// Weakness appended when momentum fell back to the neutral score.
pub const MOMENTUM_UNAVAILABLE: &str = "Momentum score not yet available (no price data)";

/// Factor-level labels: (strong label, good label, weak label, weak-below threshold).
struct FactorLabels {
    excellent: &'static str,
    good: &'static str,
    weak: &'static str,
    weak_below: f64,
}

const VALUE_LABELS: FactorLabels = FactorLabels {
    excellent: "Excellent valuation",
    good: "Good valuation",
    weak: "Expensive valuation",
    weak_below: 8.0,
};

const QUALITY_LABELS: FactorLabels = FactorLabels {
    excellent: "High-quality business",
    good: "Good quality metrics",
    weak: "Weak profitability",
    weak_below: 10.0,
};

const HEALTH_LABELS: FactorLabels = FactorLabels {
    excellent: "Strong balance sheet",
    good: "Solid financial health",
    weak: "Concerning financial health",
    weak_below: 10.0,
};

fn classify_factor(
    factor: &FactorScore,
    labels: &FactorLabels,
    strengths: &mut Vec<String>,
    weaknesses: &mut Vec<String>,
) {
    let score = factor.score;
    if score >= 20.0 {
        strengths.push(format!("{} (scored {:.1}/25)", labels.excellent, score));
    } else if score >= 15.0 {
        strengths.push(format!("{} (scored {:.1}/25)", labels.good, score));
    } else if score < labels.weak_below {
        weaknesses.push(format!("{} (scored {:.1}/25)", labels.weak, score));
    }
}

/// Factor-level then sub-scale-level highlights, each list capped at five.
pub(crate) fn strengths_and_weaknesses(
    value: &FactorScore,
    quality: &FactorScore,
    health: &FactorScore,
    momentum_missing: bool,
) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    classify_factor(value, &VALUE_LABELS, &mut strengths, &mut weaknesses);
    classify_factor(quality, &QUALITY_LABELS, &mut strengths, &mut weaknesses);
    classify_factor(health, &HEALTH_LABELS, &mut strengths, &mut weaknesses);

    // Small sub-scales (max < 5) are too coarse to call out.
    for component in [value, quality, health]
        .iter()
        .flat_map(|factor| factor.components.iter())
        .filter(|c| c.max >= 5.0)
    {
        let pct = component.pct_of_max();
        let name = component.name.to_lowercase();
        if pct >= 90.0 {
            strengths.push(format!("Excellent {} ({:.1}/{:.0})", name, component.score, component.max));
        } else if pct <= 20.0 {
            weaknesses.push(format!("Weak {} ({:.1}/{:.0})", name, component.score, component.max));
        }
    }

    strengths.truncate(MAX_ENTRIES);
    weaknesses.truncate(MAX_ENTRIES);

    if momentum_missing {
        weaknesses.push(MOMENTUM_UNAVAILABLE.to_string());
    }

    (strengths, weaknesses)
}

pub(crate) fn reasoning(
    signal: Signal,
    value: &FactorScore,
    quality: &FactorScore,
    health: &FactorScore,
    strengths: &[String],
    weaknesses: &[String],
) -> String {
    let intro = match signal {
        Signal::StrongBuy => "Exceptional investment opportunity with strong fundamentals across all factors.",
        Signal::Buy => "Attractive investment candidate with solid fundamentals.",
        Signal::Hold => "Mixed signals - some strengths but also notable weaknesses.",
        Signal::Sell => "Multiple concerning factors make this unattractive at current levels.",
        Signal::StrongSell => "Significant fundamental problems across multiple areas.",
    };

    let mut summary = Vec::new();
    if value.score >= 18.0 {
        summary.push("attractively valued");
    } else if value.score < 10.0 {
        summary.push("expensive");
    }
    if quality.score >= 18.0 {
        summary.push("high-quality business model");
    } else if quality.score < 10.0 {
        summary.push("weak profitability");
    }
    if health.score >= 18.0 {
        summary.push("strong balance sheet");
    } else if health.score < 10.0 {
        summary.push("concerning financial health");
    }

    let mut text = String::from(intro);
    text.push(' ');
    if !summary.is_empty() {
        text.push_str(&format!("This stock is {}. ", summary.join(", ")));
    }
    if !strengths.is_empty() {
        text.push_str(&format!("Key strengths: {}. ", top_three(strengths)));
    }
    if !weaknesses.is_empty() {
        text.push_str(&format!("Key weaknesses: {}. ", top_three(weaknesses)));
    }

    let action = match signal {
        Signal::StrongBuy | Signal::Buy => "Consider for further research and potential investment.",
        Signal::Hold => "Wait for better entry point or improvement in weak areas.",
        Signal::Sell | Signal::StrongSell => "Better opportunities likely available elsewhere.",
    };
    text.push_str(action);
    text
}

fn top_three(entries: &[String]) -> String {
    entries.iter().take(3).cloned().collect::<Vec<_>>().join("; ")
}
