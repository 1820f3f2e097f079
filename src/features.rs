//! Flat numeric features derived from an analysis, for scoring models

use serde::Serialize;

use crate::suggestion::Action;
use crate::{Analysis, Trend};

/// Names of every feature, in output order
pub const FEATURE_NAMES: [&str; 18] = [
    "support_levels",
    "resistance_levels",
    "demand_zones",
    "supply_zones",
    "bullish_order_blocks",
    "bearish_order_blocks",
    "bullish_fvgs",
    "bearish_fvgs",
    "buy_side_pools",
    "sell_side_pools",
    "patterns",
    "action_buy",
    "action_sell",
    "trend_up",
    "trend_down",
    "trend_ranging",
    "confidence",
    "rsi",
];

/// RSI used when the series was too short to compute one
const RSI_FALLBACK: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub values: [f64; FEATURE_NAMES.len()],
}

impl FeatureVector {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let action = analysis.suggestion.action;
        let trend = analysis.structure.trend;

        Self {
            values: [
                analysis.support.len() as f64,
                analysis.resistance.len() as f64,
                analysis.demand_zones.len() as f64,
                analysis.supply_zones.len() as f64,
                analysis.bullish_order_blocks.len() as f64,
                analysis.bearish_order_blocks.len() as f64,
                analysis.bullish_fvgs.len() as f64,
                analysis.bearish_fvgs.len() as f64,
                analysis.liquidity.buy_side.len() as f64,
                analysis.liquidity.sell_side.len() as f64,
                analysis.patterns.len() as f64,
                flag(action == Action::Buy),
                flag(action == Action::Sell),
                flag(trend == Trend::Uptrend),
                flag(trend == Trend::Downtrend),
                flag(trend == Trend::Ranging),
                f64::from(analysis.confidence),
                analysis.indicators.rsi.unwrap_or(RSI_FALLBACK),
            ],
        }
    }

    pub fn names() -> &'static [&'static str] {
        &FEATURE_NAMES
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        let i = FEATURE_NAMES.iter().position(|n| *n == name)?;
        Some(self.values[i])
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

impl From<&Analysis> for FeatureVector {
    fn from(analysis: &Analysis) -> Self {
        Self::from_analysis(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Analyzer, Candle};

    #[test]
    fn test_short_series_features() {
        let bars = vec![
            Candle::new(0, 1.0, 1.2, 0.9, 1.1),
            Candle::new(60, 1.1, 1.3, 1.0, 1.2),
        ];
        let analysis = Analyzer::default().analyze("X", &bars).unwrap();
        let features = FeatureVector::from_analysis(&analysis);

        assert_eq!(features.get("trend_ranging"), Some(1.0));
        assert_eq!(features.get("trend_up"), Some(0.0));
        assert_eq!(features.get("action_buy"), Some(0.0));
        assert_eq!(features.get("confidence"), Some(30.0));
        assert_eq!(features.get("rsi"), Some(50.0));
        assert_eq!(features.get("unknown"), None);
    }

    #[test]
    fn test_names_align_with_values() {
        let bars = vec![Candle::new(0, 1.0, 1.2, 0.9, 1.1)];
        let analysis = Analyzer::default().analyze("X", &bars).unwrap();
        let features = FeatureVector::from(&analysis);
        assert_eq!(features.pairs().count(), FeatureVector::names().len());
        assert_eq!(features.to_vec().len(), FEATURE_NAMES.len());
        let trend_flags: f64 = ["trend_up", "trend_down", "trend_ranging"]
            .iter()
            .filter_map(|n| features.get(n))
            .sum();
        assert_eq!(trend_flags, 1.0);
    }
}
