//! Human-readable summary of an analysis

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Analysis, Trend, Zone};

/// Five short paragraphs describing an [`Analysis`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub overview: String,
    pub structure: String,
    pub levels: String,
    pub liquidity: String,
    pub prediction: String,
}

impl Narrative {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let price = analysis.current_price;
        let subject = match &analysis.timeframe {
            Some(tf) => format!("{} ({tf})", analysis.symbol),
            None => analysis.symbol.clone(),
        };

        let overview = format!(
            "{subject} last traded at {price:.5}. Suggestion: {} with {}% confidence. {}",
            analysis.suggestion.action, analysis.confidence, analysis.suggestion.reason
        );

        let structure = analysis.structure.explanation.clone();

        Self {
            overview,
            structure,
            levels: describe_levels(analysis),
            liquidity: describe_liquidity(analysis),
            prediction: predict(analysis.structure.trend),
        }
    }
}

fn zone_span(zone: &Zone) -> String {
    format!("{} {:.5}-{:.5}", zone.kind.label(), zone.low, zone.high)
}

fn describe_levels(analysis: &Analysis) -> String {
    let price = analysis.current_price;
    let zones = analysis.zone_set();
    let mut parts = Vec::new();

    if let Some(zone) = zones.bullish().chain(zones.bearish()).find(|z| z.contains(price)) {
        parts.push(format!("Price is inside the {}.", zone_span(zone)));
    }

    let above = analysis
        .resistance
        .iter()
        .filter(|r| **r > price)
        .map(|r| (*r, format!("swing-high resistance {r:.5}")))
        .chain(
            zones
                .bearish()
                .filter(|z| z.low > price)
                .map(|z| (z.low, zone_span(z))),
        )
        .min_by(|a, b| a.0.total_cmp(&b.0));
    match above {
        Some((_, text)) => parts.push(format!("Nearest resistance above: {text}.")),
        None => parts.push("No resistance identified above price.".to_string()),
    }

    let below = analysis
        .support
        .iter()
        .filter(|s| **s < price)
        .map(|s| (*s, format!("swing-low support {s:.5}")))
        .chain(
            zones
                .bullish()
                .filter(|z| z.high < price)
                .map(|z| (z.high, zone_span(z))),
        )
        .max_by(|a, b| a.0.total_cmp(&b.0));
    match below {
        Some((_, text)) => parts.push(format!("Nearest support below: {text}.")),
        None => parts.push("No support identified below price.".to_string()),
    }

    parts.join(" ")
}

fn describe_liquidity(analysis: &Analysis) -> String {
    let pools = &analysis.liquidity;
    if pools.is_empty() {
        return "No clustered liquidity pools detected.".to_string();
    }

    let mut parts = Vec::new();
    if let Some(level) = pools.nearest_above(analysis.current_price) {
        parts.push(format!("Buy-side liquidity rests above {level:.5}."));
    } else if !pools.buy_side.is_empty() {
        parts.push(format!(
            "{} buy-side pool(s), none above current price.",
            pools.buy_side.len()
        ));
    }
    if let Some(level) = pools.nearest_below(analysis.current_price) {
        parts.push(format!("Sell-side liquidity rests below {level:.5}."));
    } else if !pools.sell_side.is_empty() {
        parts.push(format!(
            "{} sell-side pool(s), none below current price.",
            pools.sell_side.len()
        ));
    }
    parts.join(" ")
}

fn predict(trend: Trend) -> String {
    match trend {
        Trend::Uptrend => {
            "Bias is bullish: look for pullbacks into demand or bullish order blocks to hold, targeting buy-side liquidity."
        }
        Trend::Downtrend => {
            "Bias is bearish: look for rallies into supply or bearish order blocks to fail, targeting sell-side liquidity."
        }
        Trend::Ranging => {
            "No directional bias: expect rotation between the range edges until structure breaks."
        }
    }
    .to_string()
}

impl fmt::Display for Narrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Overview: {}", self.overview)?;
        writeln!(f, "Structure: {}", self.structure)?;
        writeln!(f, "Levels: {}", self.levels)?;
        writeln!(f, "Liquidity: {}", self.liquidity)?;
        write!(f, "Outlook: {}", self.prediction)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Analyzer, Candle};

    fn wave(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let k = i % 20;
                let tri = if k <= 10 { k as f64 } else { (20 - k) as f64 };
                let mid = 100.0 + tri;
                Candle::new(i as i64 * 60, mid, mid + 0.5, mid - 0.5, mid + 0.1)
            })
            .collect()
    }

    #[test]
    fn test_narrative_sections() {
        let analysis = Analyzer::default().analyze("EURUSD", &wave(61)).unwrap();
        let n = &analysis.narrative;

        assert!(n.overview.starts_with("EURUSD last traded at"));
        assert!(n.overview.contains("% confidence"));
        assert_eq!(n.structure, analysis.structure.explanation);
        assert!(!n.levels.is_empty());
        assert!(!n.liquidity.is_empty());
        assert!(n.prediction.contains("No directional bias"));
    }

    #[test]
    fn test_equal_swings_form_pools_in_text() {
        let analysis = Analyzer::default().analyze("EURUSD", &wave(61)).unwrap();
        // Identical swing highs at 110.5 and lows at 99.5
        assert!(analysis.narrative.liquidity.contains("Buy-side liquidity rests above 110.50000"));
        assert!(analysis.narrative.liquidity.contains("Sell-side liquidity rests below 99.50000"));
    }

    #[test]
    fn test_display_lists_every_section() {
        let analysis = Analyzer::default().analyze("EURUSD", &wave(61)).unwrap();
        let text = analysis.narrative.to_string();
        for label in ["Overview:", "Structure:", "Levels:", "Liquidity:", "Outlook:"] {
            assert!(text.contains(label), "missing {label}");
        }
    }

    #[test]
    fn test_timeframe_in_overview() {
        let analysis = Analyzer::default()
            .analyze_timeframe("EURUSD", "H4", &wave(30))
            .unwrap();
        assert!(analysis.narrative.overview.starts_with("EURUSD (H4)"));
    }
}
